pub mod directory;
pub mod memory;
pub mod slots;
pub mod store;

pub use directory::DoctorDirectoryService;
pub use memory::InMemoryDoctorStore;
pub use slots::SlotAllocator;
pub use store::{DoctorStore, SupabaseDoctorStore};
