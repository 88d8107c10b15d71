// ID Provider Port (for deterministic testing)

/// ID provider interface (allows deterministic correlation ids in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new unique correlation id
    fn generate_id(&self) -> String;
}

/// UUID v4 provider (production)
///
/// The binary receives the id as `uid=<id>`, so the simple (hyphen-free) form is used.
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}
