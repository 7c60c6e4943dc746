// LTM Gateway - Library Root
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All modules exported here for use by the binary and tests.

pub mod paths;
pub mod config;
pub mod error;
pub mod model;

// ============================================================================
// ENGINE - trait seam + bundled LMDB implementation
// ============================================================================

/// MemoryEngine / TagSearch traits
pub mod engine;

/// LTM.DB: LMDB-backed persona, memories, updates and tag index
pub mod store;

// ============================================================================
// GATEWAY - lifecycle, routing, protocol
// ============================================================================

pub mod session;
pub mod envelope;
pub mod tools;
pub mod resources;
pub mod dispatch;
pub mod shutdown;
pub mod mcp;
