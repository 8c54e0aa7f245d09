use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{err, ok, Ready};
use uuid::Uuid;

use crate::errors::AppError;

/// Extractor providing the request's owner identity.
///
/// Authentication itself lives upstream; by the time a request reaches
/// this service the gateway has resolved the session and stamped the
/// owner onto the `X-Owner-Id` header.
pub struct OwnerId {
    pub owner_id: Uuid,
}

impl FromRequest for OwnerId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = match req
            .headers()
            .get("X-Owner-Id")
            .and_then(|h| h.to_str().ok())
        {
            Some(value) => value,
            None => {
                return err(AppError::Unauthorized(
                    "Missing X-Owner-Id header".to_string(),
                ))
            }
        };

        match Uuid::parse_str(header) {
            Ok(owner_id) => ok(OwnerId { owner_id }),
            Err(_) => err(AppError::Unauthorized(
                "Invalid X-Owner-Id header".to_string(),
            )),
        }
    }
}
