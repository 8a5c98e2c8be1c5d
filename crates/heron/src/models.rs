//! These models represent the objects passed around by the orchestration loop
//!
//! There are a few related formats we need to interact with:
//! - openai messages/tools, sent over the wire to chat-completion endpoints
//! - anthropic messages/tools, sent over the wire to the messages endpoint
//! - tool invocations, dispatched to locally registered handlers
//!
//! Wire payloads are converted to and from these internal structs at the
//! provider boundary, so the loop itself only ever sees one shape.
pub mod message;
pub mod tool;
