use crate::identity::codes;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

/// Maps an identity provider error code to the message shown to the user.
/// Unknown codes fall back to a generic message.
pub fn localize(code: &str, locale: Locale) -> &'static str {
    match locale {
        Locale::Es => match code {
            codes::INVALID_EMAIL => "El correo electrónico no es válido.",
            codes::USER_NOT_FOUND => "No existe una cuenta con este correo.",
            codes::WRONG_PASSWORD | codes::INVALID_CREDENTIAL => "Correo o contraseña incorrectos.",
            codes::EMAIL_IN_USE => "Este correo ya está registrado.",
            codes::WEAK_PASSWORD => "La contraseña debe tener al menos 6 caracteres.",
            codes::USER_DISABLED => "Esta cuenta ha sido deshabilitada.",
            codes::TOO_MANY_REQUESTS => "Demasiados intentos. Inténtalo más tarde.",
            codes::POPUP_CLOSED => "Se canceló el inicio de sesión.",
            codes::OPERATION_NOT_ALLOWED => "Este método de inicio de sesión no está habilitado.",
            codes::TOKEN_EXPIRED => "Tu sesión ha expirado. Vuelve a iniciar sesión.",
            codes::NETWORK_FAILED => "Error de conexión. Revisa tu red.",
            _ => "Ocurrió un error. Inténtalo de nuevo.",
        },
        Locale::En => match code {
            codes::INVALID_EMAIL => "The email address is not valid.",
            codes::USER_NOT_FOUND => "No account exists for this email.",
            codes::WRONG_PASSWORD | codes::INVALID_CREDENTIAL => "Incorrect email or password.",
            codes::EMAIL_IN_USE => "This email is already registered.",
            codes::WEAK_PASSWORD => "The password must be at least 6 characters long.",
            codes::USER_DISABLED => "This account has been disabled.",
            codes::TOO_MANY_REQUESTS => "Too many attempts. Try again later.",
            codes::POPUP_CLOSED => "Sign-in was cancelled.",
            codes::OPERATION_NOT_ALLOWED => "This sign-in method is not enabled.",
            codes::TOKEN_EXPIRED => "Your session has expired. Please sign in again.",
            codes::NETWORK_FAILED => "Connection error. Check your network.",
            _ => "Something went wrong. Please try again.",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_codes() {
        assert_eq!(localize(codes::WRONG_PASSWORD, Locale::En), "Incorrect email or password.");
        assert_eq!(localize(codes::INVALID_CREDENTIAL, Locale::Es), "Correo o contraseña incorrectos.");
        assert_eq!(localize("auth/something-new", Locale::En), "Something went wrong. Please try again.");
        assert_eq!(localize("", Locale::Es), "Ocurrió un error. Inténtalo de nuevo.");
    }
}
