//! Kernel identity reported to notebook frontends.

use serde::Serialize;

/// Language metadata for the kernel-info reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub name: &'static str,
    pub mimetype: &'static str,
    pub file_extension: &'static str,
}

/// Static description of this kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KernelInfo {
    pub implementation: &'static str,
    pub implementation_version: &'static str,
    pub language: &'static str,
    /// Informational only; not checked against the running binary.
    pub language_version: &'static str,
    pub banner: &'static str,
    pub language_info: LanguageInfo,
}

/// The Surface Evolver kernel.
pub const KERNEL_INFO: KernelInfo = KernelInfo {
    implementation: "surface_evolver_kernel",
    implementation_version: env!("CARGO_PKG_VERSION"),
    language: "evolver",
    language_version: "2.70",
    banner: "Surface Evolver kernel",
    language_info: LanguageInfo {
        name: "evolver",
        mimetype: "text/plain",
        file_extension: ".fe",
    },
};
