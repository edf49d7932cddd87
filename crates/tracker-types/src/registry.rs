//! Registry trait for self-registering implementations.
//!
//! Remote and storage backends each expose a `Registry` type implementing
//! this trait so the service can collect them by configuration name.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// for example `http` in `[remote.implementations.http]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
