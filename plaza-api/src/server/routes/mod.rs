use crate::server::ServerRouter;

mod replies;
mod statuses;
mod topics;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(statuses::routes())
        .merge(replies::routes())
        .merge(topics::routes())
}
