//! Database access: pool, retrying handle, repositories and advisory locks

pub mod admins;
pub mod extra_fields;
pub mod features;
pub mod lenient;
pub mod lock;
pub mod masks;
pub mod models;
pub mod pool;
pub mod reviews;
pub mod settings;
pub mod users;
pub mod videos;

// Re-exports for convenience
pub use admins::AdminRepo;
pub use extra_fields::ExtraFieldRepo;
pub use features::FeatureRepo;
pub use lock::{AdvisoryLock, PgAdvisoryLock};
pub use masks::MaskRepo;
pub use pool::{clear_prepared_statements, connect_options, create_pool, Database};
pub use reviews::ReviewRepo;
pub use settings::SettingRepo;
pub use users::UserRepo;
pub use videos::VideoRepo;

impl Database {
    pub fn users(&self) -> UserRepo<'_> {
        UserRepo::new(self)
    }

    pub fn masks(&self) -> MaskRepo<'_> {
        MaskRepo::new(self)
    }

    pub fn videos(&self) -> VideoRepo<'_> {
        VideoRepo::new(self)
    }

    pub fn features(&self) -> FeatureRepo<'_> {
        FeatureRepo::new(self)
    }

    pub fn reviews(&self) -> ReviewRepo<'_> {
        ReviewRepo::new(self)
    }

    pub fn extra_fields(&self) -> ExtraFieldRepo<'_> {
        ExtraFieldRepo::new(self)
    }

    pub fn admins(&self) -> AdminRepo<'_> {
        AdminRepo::new(self)
    }

    pub fn settings(&self) -> SettingRepo<'_> {
        SettingRepo::new(self)
    }
}
