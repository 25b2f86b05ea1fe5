pub mod flow;
pub mod payment;
pub mod seat_map;
pub mod session;

pub use flow::{BookingFlow, FlowError, Step, TicketChange};
pub use payment::{PaymentError, PaymentProcessor};
pub use seat_map::{SeatError, SeatId, SeatMap, SeatState};
pub use session::{BookingSession, PaymentState, ShowtimeSelection};
