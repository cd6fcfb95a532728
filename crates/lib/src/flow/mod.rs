//! Client for the remote flow service's run API.
//!
//! `POST {base_url}/api/v1/run/{endpoint}` with a chat message and optional tweaks; the reply
//! text is pulled out of the nested `outputs` structure by [`extract_message`].

mod client;
mod reply;
mod request;

pub use client::{FlowClient, FlowError, FlowResponse, FlowRunner};
pub use reply::{extract_message, NO_MESSAGE_FALLBACK};
pub use request::{RunPayload, RunRequest, API_KEY_HEADER};
