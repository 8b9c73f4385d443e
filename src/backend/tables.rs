//! Names of the hosted tables and storage bucket.

pub const ENVIRONMENTAL_DATA: &str = "environmental_data";
pub const RESTORATION_PROJECTS: &str = "restoration_projects";
pub const NOTIFICATIONS: &str = "notifications";
pub const UPLOADED_FILES: &str = "uploaded_files";
pub const PROFILES: &str = "profiles";

/// Project reads embed their techniques and species.
pub const PROJECT_SELECT: &str = "*,restoration_techniques(*),plant_species(*)";

pub mod roles {
    /// Profiles created by demo provisioning and the planner.
    pub const VIEWER: &str = "viewer";
    /// Profiles created by the sign-up webhook.
    pub const USER: &str = "user";
}

pub mod status {
    pub const PLANNED: &str = "planned";
    pub const ACTIVE: &str = "active";
    pub const COMPLETED: &str = "completed";
}
