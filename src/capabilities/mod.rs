// ABOUTME: Built-in capability implementations shipped with the CLI
// ABOUTME: Provides `echo` and `command` and helpers to register them

pub mod command;
pub mod echo;

pub use command::CommandCapability;
pub use echo::EchoCapability;

use crate::engine::CapabilityRegistry;

/// Names of the built-in capabilities, sorted.
pub const BUILTIN: &[&str] = &["command", "echo"];

pub fn register_builtin(registry: &mut CapabilityRegistry) {
    registry.register("command", CommandCapability::new());
    registry.register("echo", EchoCapability);
}

pub fn builtin_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    register_builtin(&mut registry);
    registry
}
