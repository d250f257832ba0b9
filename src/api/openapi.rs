use super::handlers::{auth, health, me, opportunities, orders, parking, tickets, venues};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
/// Routes added outside (like `/` or `OPTIONS /health`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::register::register))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::refresh::refresh))
        .routes(routes!(me::get_me, me::patch_me))
        .routes(routes!(
            venues::venues::list_venues,
            venues::venues::create_venue
        ))
        .routes(routes!(
            venues::venues::get_venue,
            venues::venues::update_venue
        ))
        .routes(routes!(
            venues::events::list_events,
            venues::events::create_event
        ))
        .routes(routes!(venues::events::cancel_event))
        .routes(routes!(tickets::issue_ticket))
        .routes(routes!(tickets::my_tickets))
        .routes(routes!(tickets::check_in))
        .routes(routes!(parking::open_parking, parking::list_parking))
        .routes(routes!(parking::close_parking))
        .routes(routes!(
            opportunities::list_opportunities,
            opportunities::create_opportunity
        ))
        .routes(routes!(opportunities::register_interest))
        .routes(routes!(orders::place_order))
        .routes(routes!(orders::my_orders))
        .routes(routes!(orders::update_order_status));

    let mut ingresso_tag = Tag::new("ingresso");
    ingresso_tag.description = Some("Venue services and access API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Registration, login, and token refresh".to_string());

    let mut venues_tag = Tag::new("venues");
    venues_tag.description = Some("Venue and event catalog".to_string());

    router.get_openapi_mut().tags = Some(vec![ingresso_tag, auth_tag, venues_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Ingresso"));
            assert_eq!(contact.email.as_deref(), Some("team@ingresso.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "ingresso"));
        assert!(tags.iter().any(|tag| tag.name == "auth"));

        assert!(spec.paths.paths.contains_key("/v1/auth/register"));
        assert!(spec.paths.paths.contains_key("/v1/auth/login"));
        assert!(spec.paths.paths.contains_key("/v1/auth/refresh"));
        assert!(spec.paths.paths.contains_key("/v1/me"));
        assert!(spec.paths.paths.contains_key("/v1/venues"));
        assert!(spec.paths.paths.contains_key("/v1/venues/{venue_slug}/parking"));
        assert!(spec.paths.paths.contains_key("/v1/tickets/{code}/check-in"));
        assert!(spec.paths.paths.contains_key("/v1/opportunities"));
        assert!(spec.paths.paths.contains_key("/v1/orders/{order_id}/status"));
    }
}
