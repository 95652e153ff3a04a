pub mod appointment;
pub mod booking;
pub mod cancellation;
pub mod clock;
pub mod lifecycle;
pub mod locks;
pub mod notices;
pub mod report;

pub use appointment::AppointmentService;
pub use booking::BookingService;
pub use cancellation::{check_cancellation_window, CancellationService};
pub use clock::{Clock, FixedClock, SystemClock};
pub use locks::SlotLockRegistry;
pub use report::{ReportRegistry, ReportService};
