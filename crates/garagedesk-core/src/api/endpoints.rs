//! Backend paths, relative to the `{base}/api` root.

/// Obtain a token pair: `{username, password}` -> `{access, refresh}`
pub const LOGIN: &str = "/auth/jwt/create/";

/// Exchange a refresh token: `{refresh}` -> `{access}`
pub const TOKEN_REFRESH: &str = "/auth/token/refresh/";

pub const USERS: &str = "/auth/users/";
pub const CURRENT_USER: &str = "/auth/users/me/";
pub const SET_PASSWORD: &str = "/auth/users/set_password/";

pub const CLIENTS: &str = "/clients/";
pub const VEHICLES: &str = "/vehicles/";
pub const EMPLOYEES: &str = "/employees/";
pub const JOB_CARDS: &str = "/jobcards/";
pub const INVENTORY: &str = "/inventory/";
pub const APPOINTMENTS: &str = "/appointments/";
pub const INVOICES: &str = "/invoices/";

/// Path of one member of a collection: `/clients/` + 4 -> `/clients/4/`
pub fn member(collection: &str, id: i64) -> String {
    format!("{}/{}/", collection.trim_end_matches('/'), id)
}

/// True if `path` addresses the token refresh endpoint, ignoring any query
/// string, host prefix, or trailing slash.
pub fn is_token_refresh(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_end_matches('/')
        .ends_with(TOKEN_REFRESH.trim_end_matches('/'))
}
