//! Webhook signature middleware for Actix Web.
//!
//! The payment gateway signs every webhook it sends with the webhook secret configured on its dashboard. The signature
//! is the base64-encoded HMAC-SHA256 of the raw request body, and is provided in the `X-Gateway-Signature` header.
//!
//! The middleware buffers the body (up to [`MAX_WEBHOOK_BODY`] bytes), checks it against the header, and hands the
//! same bytes back to the request so that the handler can deserialize them as usual. Forged or unsigned notifications
//! are answered with `403 Forbidden` and never reach the handlers.

use std::{
    fmt::Display,
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorPayloadTooLarge},
    http::header::HeaderMap,
    web::{Bytes, BytesMut},
    Error,
    HttpMessage,
};
use futures::{future::LocalBoxFuture, StreamExt};
use log::{trace, warn};
use storefront_common::Secret;

use crate::helpers::verify_hmac;

pub const GATEWAY_SIGNATURE_HEADER: &str = "X-Gateway-Signature";
/// Gateway notifications are small JSON documents. Anything bigger than this is refused outright.
pub const MAX_WEBHOOK_BODY: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRejection {
    Missing,
    Mismatch,
}

impl Display for SignatureRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "No webhook signature found."),
            Self::Mismatch => write!(f, "Invalid webhook signature."),
        }
    }
}

/// The header to read and the secret to check it with.
struct WebhookSigner {
    header: String,
    secret: Secret<String>,
}

impl WebhookSigner {
    fn check(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), SignatureRejection> {
        let claimed = headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .ok_or(SignatureRejection::Missing)?;
        if verify_hmac(self.secret.reveal(), body, claimed.trim()) {
            Ok(())
        } else {
            Err(SignatureRejection::Mismatch)
        }
    }
}

async fn read_body(payload: &mut Payload) -> Result<Bytes, Error> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > MAX_WEBHOOK_BODY {
            warn!("🔐️ Webhook body is larger than {MAX_WEBHOOK_BODY} bytes. Refusing it.");
            return Err(ErrorPayloadTooLarge("Webhook body is too large."));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// A fresh payload that yields `body` again to whoever reads the request next.
fn replay(body: Bytes) -> Payload {
    let (_, mut payload) = h1::Payload::create(true);
    payload.unread_data(body);
    Payload::from(payload)
}

pub struct HmacMiddlewareFactory {
    signer: Rc<WebhookSigner>,
    // When false every webhook is let through unchecked
    enabled: bool,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Secret<String>, enabled: bool) -> Self {
        let signer = WebhookSigner { header: hmac_header.to_string(), secret: key };
        Self { signer: Rc::new(signer), enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        let signer = self.enabled.then(|| Rc::clone(&self.signer));
        ready(Ok(HmacMiddlewareService { signer, service: Rc::new(service) }))
    }
}

pub struct HmacMiddlewareService<S> {
    /// `None` when signature checks are switched off
    signer: Option<Rc<WebhookSigner>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let Some(signer) = self.signer.clone() else {
            trace!("🔐️ Webhook signature checks are disabled. Allowing {}", req.path());
            return Box::pin(service.call(req));
        };
        Box::pin(async move {
            let mut payload = req.take_payload();
            let body = read_body(&mut payload).await?;
            if let Err(rejection) = signer.check(req.headers(), &body) {
                warn!("🔐️ Denying webhook call to {}. {rejection}", req.path());
                return Err(ErrorForbidden(rejection.to_string()));
            }
            trace!("🔐️ Webhook signature for {} ✅️", req.path());
            req.set_payload(replay(body));
            service.call(req).await
        })
    }
}
