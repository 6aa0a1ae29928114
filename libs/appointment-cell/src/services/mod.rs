pub mod booking;
pub mod cancellation;
pub mod dashboard;
pub mod lifecycle;
pub mod memory;
pub mod store;

pub use booking::AppointmentBookingService;
pub use cancellation::AppointmentCancellationService;
pub use dashboard::DoctorDashboardService;
pub use lifecycle::AppointmentLifecycleService;
pub use memory::{InMemoryAppointmentStore, InMemoryPatientStore};
pub use store::{
    AppointmentStore, FlagGuard, FlagPatch, PatientStore, SupabaseAppointmentStore, SupabasePatientStore,
};
