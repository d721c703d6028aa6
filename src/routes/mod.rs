/// Router Module Index
///
/// Splits the routing table by access level, so the authentication boundary is
/// applied once at the router layer instead of per handler.
///
/// Routes readable by anonymous viewers. Their handlers resolve the viewer
/// through `OptionalAuthUser` and defer every visibility decision to the
/// policy module.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware. Requires a valid
/// session; ownership checks happen in the handlers via the policy module.
pub mod authenticated;
