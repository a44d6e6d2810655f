//! Page scripts evaluated through `Runtime.evaluate`.
//!
//! Locators and values are embedded as JSON string literals so no input can
//! break out of the script.

use relocate_core::FormField;

use crate::protocol::InspectedInput;

fn literal(value: &str) -> String {
    // Serializing a &str to JSON cannot fail.
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Set an input's value and fire the events frameworks listen for.
///
/// Evaluates to `false` when the locator matches nothing.
pub fn fill(locator: &str, value: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({locator});
  if (!el) return false;
  el.focus();
  if (el.tagName === 'SELECT') {{
    el.value = {value};
  }} else {{
    const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
    setter.call(el, {value});
  }}
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  el.blur();
  return true;
}})()"#,
        locator = literal(locator),
        value = literal(value),
    )
}

/// Click an element. Evaluates to `false` when the locator matches nothing.
pub fn click(locator: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({locator});
  if (!el) return false;
  el.scrollIntoView({{ block: 'center' }});
  el.click();
  return true;
}})()"#,
        locator = literal(locator),
    )
}

pub const READY_STATE: &str = "document.readyState";

pub const CURRENT_URL: &str = "window.location.href";

/// JSON array describing every visible input, select and textarea.
pub const INSPECT_INPUTS: &str = r#"JSON.stringify(
  Array.from(document.querySelectorAll('input, select, textarea'))
    .filter(el => el.type !== 'hidden')
    .map(el => {
      const label = (el.id && document.querySelector(`label[for="${CSS.escape(el.id)}"]`))
        || el.closest('label');
      return {
        id: el.id || null,
        name: el.name || null,
        label: label ? label.textContent.trim() : (el.getAttribute('aria-label') || null),
        type: el.tagName === 'INPUT' ? (el.type || 'text') : el.tagName.toLowerCase(),
        value: el.type === 'password' ? '' : (el.value || ''),
      };
    })
)"#;

/// Turn inspected inputs into form fields with a usable locator.
///
/// Inputs with neither id nor name cannot be addressed and are dropped.
pub fn to_form_fields(inputs: Vec<InspectedInput>) -> Vec<FormField> {
    inputs
        .into_iter()
        .filter_map(|input| {
            let id = input.id.filter(|id| !id.is_empty());
            let name = input.name.filter(|name| !name.is_empty());
            let locator = match (&id, &name) {
                (Some(id), _) => format!("#{}", id),
                (None, Some(name)) => format!("[name={}]", literal(name)),
                (None, None) => return None,
            };
            Some(FormField {
                name: name.or(id),
                label: input.label.filter(|label| !label.is_empty()),
                kind: input.kind,
                locator,
                value: input.value,
            })
        })
        .collect()
}
