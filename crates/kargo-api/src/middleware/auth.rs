//! Authentication middleware
//!
//! Validates the bearer token, rejects revoked sessions, and stores the
//! claims plus the derived tenant scope in the request extensions. Scoped
//! handlers extract them with [`AuthUser`] and [`Scoped`].

use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use kargo_core::auth::{Claims, TenantScope};
use kargo_core::errors::ErrorKind;
use std::rc::Rc;

pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let token = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::to_string);

            let token = match token {
                Some(token) => token,
                None => {
                    return Err(ApiError::new(
                        ErrorKind::Unauthenticated,
                        "missing or invalid authorization header",
                    )
                    .into())
                }
            };

            let state = req
                .app_data::<actix_web::web::Data<AppState>>()
                .ok_or_else(|| {
                    Error::from(ApiError::new(ErrorKind::Internal, "state not configured"))
                })?;

            let claims = state
                .tokens
                .validate(&token)
                .map_err(|e| Error::from(ApiError::from(e)))?;
            if state.revocations.is_revoked(&claims.jti) {
                return Err(
                    ApiError::new(ErrorKind::Unauthenticated, "session has been logged out").into(),
                );
            }

            let scope = TenantScope::from_claims(&claims);
            req.extensions_mut().insert(claims);
            req.extensions_mut().insert(scope);

            service.call(req).await
        })
    }
}

/// The authenticated caller's claims
pub struct AuthUser(pub Claims);

impl actix_web::FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let claims = req
            .extensions()
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| {
                ApiError::new(ErrorKind::Unauthenticated, "authentication required").into()
            });
        ready(claims.map(AuthUser))
    }
}

/// The caller's tenant scope
pub struct Scoped(pub TenantScope);

impl actix_web::FromRequest for Scoped {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let scope = req
            .extensions()
            .get::<TenantScope>()
            .copied()
            .ok_or_else(|| {
                ApiError::new(ErrorKind::Unauthenticated, "authentication required").into()
            });
        ready(scope.map(Scoped))
    }
}
