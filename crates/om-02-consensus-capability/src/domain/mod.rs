//! Domain layer: requests, the request store and the round protocol
//! messages.

pub mod protocol;
mod request;
mod store;

pub use protocol::{
    decode_blob, encode_blob, AttributedObservation, Id, Observation, Observations, Outcome,
    OutcomeContext, Query, Report, ReportInfo, ReportWithInfo,
};
pub use request::{Delivery, PendingRequest, Request, TransmitResponse};
pub use store::RequestStore;
