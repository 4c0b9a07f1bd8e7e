use std::sync::Arc;

use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use type_map::concurrent::TypeMap;

use crate::{
    auth::Auth,
    error::{self, AddCode, ServiceError},
    repository::RepositoryObject,
};

pub struct ServiceState {
    pub repositories: TypeMap,
    pub service_auth: Auth,
}

impl ServiceState {
    pub fn new(service_name: String) -> Self {
        Self {
            repositories: TypeMap::new(),
            service_auth: Auth::Service(service_name),
        }
    }

    pub fn insert<T: 'static>(&mut self, repository: RepositoryObject<T>) {
        self.repositories.insert(repository);
    }

    pub fn insert_manual<T: Send + Sync + 'static>(&mut self, value: T) {
        self.repositories.insert(value);
    }
}

#[derive(Clone)]
pub struct HandlerContext {
    pub user_auth: Auth,
}

pub struct Context(pub Arc<ServiceState>, pub HandlerContext);

impl Context {
    pub fn auth(&self) -> &Auth {
        &self.1.user_auth
    }

    pub fn server_auth(&self) -> Auth {
        self.0.service_auth.clone()
    }

    pub fn get_repository<T: 'static>(&self) -> Option<RepositoryObject<T>> {
        self.0.repositories.get::<RepositoryObject<T>>().cloned()
    }

    pub fn try_get_repository<T: 'static>(&self) -> error::Result<RepositoryObject<T>> {
        self.0
            .repositories
            .get::<RepositoryObject<T>>()
            .cloned()
            .ok_or(
                anyhow::anyhow!(
                    "Repository for type {} not found",
                    std::any::type_name::<T>()
                )
                .code(500),
            )
    }

    pub fn get_manual<T: 'static + Clone>(&self) -> Option<T> {
        self.0.repositories.get::<T>().cloned()
    }

    pub fn try_get_manual<T: 'static + Clone>(&self) -> error::Result<T> {
        self.0.repositories.get::<T>().cloned().ok_or(
            anyhow::anyhow!("State entry for type {} not found", std::any::type_name::<T>())
                .code(500),
        )
    }
}

impl FromRequest for Context {
    type Error = ServiceError;

    type Future = futures_util::future::LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut actix_web::dev::Payload) -> Self::Future {
        fn from_request_inner(req: &HttpRequest, _payload: &mut Payload) -> error::Result<Context> {
            let auth = req
                .headers()
                .get("Authorization")
                .and_then(|x| x.to_str().ok())
                .and_then(|x| x.strip_prefix("Bearer "))
                .map(Auth::from_token);

            let user_auth = match auth {
                Some(Ok(Some(auth))) => auth,
                Some(Ok(None)) => {
                    log::error!("Token expired");
                    Auth::None
                }
                Some(Err(err)) => {
                    log::error!("Error parsing token: {:?}", err);
                    Auth::None
                }
                None => Auth::None,
            };

            let Some(state) = req.app_data::<Data<Arc<ServiceState>>>() else {
                return Err(anyhow::anyhow!("No state provided").code(500));
            };

            Ok(Context(
                Arc::clone(state),
                HandlerContext { user_auth },
            ))
        }
        let result = from_request_inner(req, payload);

        Box::pin(async move { result })
    }
}
