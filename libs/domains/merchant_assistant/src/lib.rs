//! # Merchant Assistant Domain
//!
//! Retrieval-augmented conversations for merchants: each question is
//! embedded, matched against the merchant's own earlier turns, answered by a
//! completion model with those turns as context, and stored along with its
//! embeddings for future retrieval.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      handlers (axum)                        │
//! │   POST /interactions        GET/PUT/DELETE /interactions/*  │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!                ▼                              ▼
//! ┌──────────────────────────────┐  ┌───────────────────────────┐
//! │      MerchantAssistant       │  │    InteractionService     │
//! │ embed → retrieve → complete  │  │      (CRUD edit flow)     │
//! │   → persist → index          │  └─────────────┬─────────────┘
//! └──┬──────────┬──────────┬─────┘                │
//!    │          │          │                      │
//!    ▼          ▼          ▼                      ▼
//! Embedding  Completion  VectorIndex      ConversationRepository
//! Provider   Provider    (Qdrant/memory)  (Postgres/memory)
//! ```
//!
//! ## Failure policy
//!
//! - embedding, completion and persistence failures abort the request
//! - retrieval failures degrade to an empty context
//! - embedding storage failures after persistence are logged and counted

pub mod assistant;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod index;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
mod upstream;

pub use assistant::{AssistantConfig, MerchantAssistant};
pub use completion::CompletionProvider;
pub use config::{ProviderKind, ProvidersConfig};
pub use embedding::EmbeddingProvider;
pub use error::{AssistantError, AssistantResult, UpstreamService};
pub use handlers::{ApiDoc, AssistantState, router};
pub use index::{IndexBackend, IndexConfig, InMemoryVectorIndex, QdrantVectorIndex, VectorIndex};
pub use models::{
    CreateInteraction, EmbeddingKind, EmbeddingRecord, Interaction, InteractionFilter,
    MerchantProfile, RetrievedContext, UpdateInteraction, VectorMatch, VectorMetadata,
};
pub use postgres::PgConversationRepository;
pub use repository::{ConversationRepository, InMemoryConversationRepository};
pub use service::InteractionService;
