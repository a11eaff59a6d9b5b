mod auth;
mod generator;
mod vault;

pub use auth::AuthView;
pub use generator::GeneratorView;
pub use vault::VaultView;
