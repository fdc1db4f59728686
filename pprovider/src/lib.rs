//! Uniform provider clients, error classification, and the static registry.
//!
//! ```rust
//! use pprovider::{ChatRequest, Message, Role};
//!
//! let request = ChatRequest::builder("llama-3.3-70b-versatile")
//!     .message(Message::new(Role::User, "hello"))
//!     .temperature(0.7)
//!     .build()
//!     .expect("request should build");
//! assert_eq!(request.messages.len(), 1);
//! ```

mod credentials;
mod error;
mod model;
mod provider;
mod registry;
mod stream;

pub mod adapters;

pub mod prelude {
    //! Common `pprovider` imports for downstream crates.

    pub use crate::{
        BoxedEventStream, ChatProvider, ChatReply, ChatRequest, ChatRequestBuilder, Message,
        ModelEventStream, ProviderCapability, ProviderDescriptor, ProviderEntry, ProviderError,
        ProviderErrorKind, ProviderFuture, ProviderId, ProviderPreference, ProviderRegistry,
        Role, StopReason, StreamEvent, TokenUsage,
    };
    pub use pcommon::{BoxFuture, GenerationOptions, SessionId};
}

pub use credentials::{SecretString, SecureCredentialManager};
pub use error::{ProviderError, ProviderErrorKind};
pub use model::{
    ChatReply, ChatRequest, ChatRequestBuilder, Message, ProviderId, Role, StopReason, TokenUsage,
};
pub use provider::{ChatProvider, ProviderFuture};
pub use registry::{
    ProviderCapability, ProviderDescriptor, ProviderEntry, ProviderPreference, ProviderRegistry,
    ProviderRegistryBuilder,
};
pub use stream::{
    BoxedEventStream, ModelEventStream, PendingEventStream, StreamEvent, VecEventStream,
};
