use axum::{
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use std::sync::Arc;

use crate::{
    handlers::{auth, quotes, tasks},
    rate_limit::{self, GuardConfig, RoutePolicy},
    state::AppState,
};

pub fn app_router(state: Arc<AppState>) -> Router {
    // one guarded sub-router per route so each carries its own counter scope
    let guard_state = state.clone();
    let guarded = move |path: &'static str,
                        handler: MethodRouter<Arc<AppState>>,
                        name: &'static str,
                        policy: RoutePolicy| {
        Router::new().route(path, handler).route_layer(
            middleware::from_fn_with_state(
                GuardConfig {
                    state: guard_state.clone(),
                    route: name,
                    policy,
                },
                rate_limit::guard,
            ),
        )
    };

    Router::new()
        .merge(guarded(
            "/register",
            post(auth::register),
            "register",
            RoutePolicy::per_minute(5),
        ))
        .merge(guarded(
            "/login",
            post(auth::login),
            "login",
            RoutePolicy::per_minute(5),
        ))
        .merge(guarded(
            "/logout",
            post(auth::logout),
            "logout",
            RoutePolicy::per_minute(5),
        ))
        .merge(guarded(
            "/refresh",
            post(auth::refresh),
            "refresh",
            RoutePolicy::per_minute(1),
        ))
        .merge(guarded(
            "/recover-password",
            post(auth::recover_password),
            "recover-password",
            RoutePolicy::per_minute(5),
        ))
        .merge(guarded(
            "/reset-password",
            post(auth::reset_password),
            "reset-password",
            RoutePolicy::per_minute(10),
        ))
        .merge(guarded(
            "/tasks",
            get(tasks::list).post(tasks::create),
            "tasks",
            RoutePolicy::per_minute(50),
        ))
        .merge(guarded(
            "/tasks/{id}",
            get(tasks::get).patch(tasks::update).delete(tasks::delete),
            "task",
            RoutePolicy::per_minute(50),
        ))
        .merge(guarded(
            "/quotes",
            get(quotes::list),
            "quotes",
            RoutePolicy::per_minute(1),
        ))
        .with_state(state)
}
