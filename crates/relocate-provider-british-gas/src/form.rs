//! Declared British Gas web forms.

use relocate_core::forms::{FormDescriptor, FormField, ServiceWebForm};

pub const BASE_URL: &str = "https://www.britishgas.co.uk";
pub const LOGIN_URL: &str = "https://www.britishgas.co.uk/identity/";
pub const ADDRESS_URL: &str = "https://www.britishgas.co.uk/account/personal-details/";

/// Post-login pages live under this path
pub const LOGGED_IN_PATH: &str = "/account/";

pub const LOGIN_SUBMIT: &str = "#login-submit";
pub const ADDRESS_SUBMIT: &str = "#update-address-submit";

pub fn login_form() -> FormDescriptor {
    FormDescriptor {
        url: LOGIN_URL.to_string(),
        fields: vec![
            FormField::text("username", "#username"),
            FormField::password("password", "#password"),
        ],
        submit_locator: LOGIN_SUBMIT.to_string(),
    }
}

pub fn address_form() -> FormDescriptor {
    FormDescriptor {
        url: ADDRESS_URL.to_string(),
        fields: vec![
            FormField::text("line1", "#address-line-1"),
            FormField::text("line2", "#address-line-2"),
            FormField::text("town", "#town"),
            FormField::text("county", "#county"),
            FormField::text("postcode", "#postcode"),
        ],
        submit_locator: ADDRESS_SUBMIT.to_string(),
    }
}

pub fn web_form() -> ServiceWebForm {
    ServiceWebForm {
        url: BASE_URL.to_string(),
        login_form: Some(login_form()),
        address_form: address_form(),
        verification_required: true,
        verification_form: None,
    }
}
