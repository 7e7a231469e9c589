// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model transport layer
//!
//! Wire types, the backend abstraction, the Ollama transport and its retry
//! policy.

pub mod message;
pub mod mock_provider;
pub mod provider;
pub mod providers;
pub mod retry;

pub use message::*;
pub use mock_provider::MockBackend;
pub use provider::*;
pub use providers::OllamaTransport;
