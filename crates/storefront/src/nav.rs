//! Role-gated navigation.

use serde::Serialize;

use farmerspot_core::Role;

use crate::session::Session;

/// One navigation link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub label: &'static str,
    pub href: &'static str,
}

const fn entry(label: &'static str, href: &'static str) -> MenuEntry {
    MenuEntry { label, href }
}

const ALWAYS: [MenuEntry; 3] = [
    entry("Home", "/"),
    entry("About", "/about"),
    entry("Contact Us", "/contact"),
];

/// The menu for whoever is signed in to `session`.
#[must_use]
pub fn menu_for(session: &Session) -> Vec<MenuEntry> {
    menu_for_role(session.role())
}

/// The menu for `role`.
#[must_use]
pub fn menu_for_role(role: Role) -> Vec<MenuEntry> {
    let mut menu = ALWAYS.to_vec();
    match role {
        Role::Guest => {
            menu.push(entry("Login", "/auth"));
            menu.push(entry("Sign Up", "/signup"));
        }
        Role::Customer => menu.push(entry("My Orders", "/orders")),
        Role::Farmer => menu.push(entry("Manage Orders", "/farmer/orders")),
        Role::Admin => menu.push(entry("Admin Dashboard", "/admin")),
    }
    if role != Role::Guest {
        menu.push(entry("Logout", "/logout"));
    }
    menu
}

/// Count to show on the cart badge: customers only, and only when non-zero.
#[must_use]
pub fn cart_badge(session: &Session, count: u32) -> Option<u32> {
    (session.has_role(Role::Customer) && count > 0).then_some(count)
}

#[cfg(test)]
mod tests {
    use farmerspot_core::UserId;

    use super::*;
    use crate::session::SessionIdentity;

    fn labels(menu: &[MenuEntry]) -> Vec<&'static str> {
        menu.iter().map(|e| e.label).collect()
    }

    fn session_as(role: Role) -> Session {
        Session::signed_in(SessionIdentity {
            user_id: UserId::new("u1"),
            role,
            display_name: "Ada".to_string(),
        })
    }

    #[test]
    fn test_guest_menu() {
        assert_eq!(
            labels(&menu_for(&Session::new())),
            vec!["Home", "About", "Contact Us", "Login", "Sign Up"]
        );
    }

    #[test]
    fn test_role_specific_entries() {
        let customer = labels(&menu_for(&session_as(Role::Customer)));
        assert!(customer.contains(&"My Orders"));
        assert!(customer.contains(&"Logout"));
        assert!(!customer.contains(&"Login"));

        let farmer = labels(&menu_for(&session_as(Role::Farmer)));
        assert!(farmer.contains(&"Manage Orders"));
        assert!(!farmer.contains(&"My Orders"));

        let admin = labels(&menu_for(&session_as(Role::Admin)));
        assert!(admin.contains(&"Admin Dashboard"));
    }

    #[test]
    fn test_cart_badge_only_for_customers_with_items() {
        assert_eq!(cart_badge(&session_as(Role::Customer), 3), Some(3));
        assert_eq!(cart_badge(&session_as(Role::Customer), 0), None);
        assert_eq!(cart_badge(&session_as(Role::Farmer), 3), None);
        assert_eq!(cart_badge(&Session::new(), 3), None);
    }
}
