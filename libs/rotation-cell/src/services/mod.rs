pub mod roster;
pub mod sequence;
pub mod cursor;
pub mod assigner;

pub use roster::{load_roster, DoctorDirectory, InMemoryDoctorDirectory, SupabaseDoctorDirectory};
pub use sequence::build_sequence;
pub use cursor::{
    build_cursor_store, CursorStore, InMemoryCursorStore, RedisCursorStore, SupabaseCursorStore,
};
pub use assigner::DoctorAssigner;
