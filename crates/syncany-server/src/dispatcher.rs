//! Operation dispatcher.
//!
//! Routes a request to its handler through a registered table of
//! (resource, method, verb) entries.

use std::io::Read;

use syncany_protocol::ops::{resources, verbs};
use syncany_protocol::{ApiError, ApiRequest, ApiResponse, Method};

use crate::handlers::{self, Reply};
use crate::services::Services;

/// Handler signature shared by all operations.
pub type HandlerFn = fn(&Services, &ApiRequest, &mut dyn Read) -> Result<Reply, ApiError>;

/// One registered operation.
#[derive(Clone)]
pub struct Route {
    pub resource: &'static str,
    pub method: Method,
    pub verb: Option<&'static str>,
    handler: HandlerFn,
}

impl Route {
    fn matches(&self, request: &ApiRequest) -> bool {
        self.resource == request.resource
            && self.method == request.method
            && self.verb == request.verb.as_deref()
    }
}

/// Dispatch table.
#[derive(Clone, Default)]
pub struct Dispatcher {
    routes: Vec<Route>,
}

impl Dispatcher {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table of all API operations.
    pub fn standard() -> Self {
        let mut dispatcher = Self::new();
        dispatcher
            .register(resources::APP, Method::Get, None, |s, r, _| handlers::app_get::handle(s, r))
            .register(resources::APP, Method::Put, None, handlers::app_put::handle)
            .register(
                resources::APP,
                Method::Put,
                Some(verbs::OSX_NOTIFIER),
                handlers::osx_notifier_put::handle,
            )
            .register(resources::LINKS, Method::Get, None, |s, r, _| handlers::links_get::handle(s, r))
            .register(resources::LINKS, Method::Post, None, |s, r, _| handlers::links_add::handle(s, r))
            .register(resources::LINKS, Method::Post, Some(verbs::ADD), |s, r, _| {
                handlers::links_add::handle(s, r)
            });
        dispatcher
    }

    /// Register a handler. A later registration for the same key wins.
    pub fn register(
        &mut self,
        resource: &'static str,
        method: Method,
        verb: Option<&'static str>,
        handler: HandlerFn,
    ) -> &mut Self {
        self.routes
            .retain(|r| !(r.resource == resource && r.method == method && r.verb == verb));
        self.routes.push(Route {
            resource,
            method,
            verb,
            handler,
        });
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the handler for a request.
    pub fn resolve(&self, request: &ApiRequest) -> Result<HandlerFn, ApiError> {
        if let Some(route) = self.routes.iter().find(|r| r.matches(request)) {
            return Ok(route.handler);
        }

        if self.routes.iter().any(|r| r.resource == request.resource) {
            let method = match request.verb.as_deref() {
                Some(verb) => format!("{} ({})", request.method, verb),
                None => request.method.to_string(),
            };
            Err(ApiError::method_not_allowed(&method, &request.resource))
        } else {
            Err(ApiError::not_found("unknown resource"))
        }
    }

    /// Run the request through its handler.
    pub fn dispatch(&self, services: &Services, request: &ApiRequest, body: &mut dyn Read) -> ApiResponse {
        let request_id = request.request_id.clone();

        let result = self
            .resolve(request)
            .and_then(|handler| handler(services, request, body));

        match result {
            Ok(reply) => ApiResponse::with_status(request_id, reply.status, reply.payload),
            Err(e) => ApiResponse::error(request_id, e),
        }
    }
}
