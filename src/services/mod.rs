pub mod messages;
pub mod routines;
pub mod storage;

pub use messages::MessageService;
pub use routines::RoutineService;
pub use storage::StorageService;
