//! C9: narrow async-trait clients for the three external collaborators this
//! server talks to over HTTP. Each ships a real `reqwest` implementation and
//! an in-memory fake so the core pipeline (C2-C7) can be tested without
//! network collaborators.

pub mod error;
pub mod object_store;
pub mod spire;
pub mod state_manager;

pub use error::CollaboratorError;
pub use object_store::{FakeObjectStoreClient, HttpObjectStoreClient, ObjectStoreClient};
pub use spire::{FakeSpireClient, HttpSpireClient, SpireClient};
pub use state_manager::{FakeStateManagerClient, HttpStateManagerClient, StateManagerClient};
