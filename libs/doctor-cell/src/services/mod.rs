pub mod availability;
pub mod doctor;
pub mod specialty;

pub use availability::AvailabilityService;
pub use doctor::DoctorService;
pub use specialty::SpecialtyService;
