//! HTML message body sent along with a request

use iconrequest_core::{App, DeviceInfo, RequestConfig};

/// Store listing prefix used for the per-app link
pub const STORE_LINK: &str = "https://play.google.com/store/apps/details?id=";

const BREAK: &str = "<br/>";

/// Compose the message body for `apps`, in the order given
pub fn build_body(config: &RequestConfig, apps: &[App], device: &DeviceInfo) -> String {
    let mut body = String::new();

    if let Some(header) = config.header.as_deref().filter(|h| !h.is_empty()) {
        body.push_str(&header.replace('\n', BREAK));
        body.push_str(BREAK);
        body.push_str(BREAK);
    }

    for (i, app) in apps.iter().enumerate() {
        if i > 0 {
            body.push_str(BREAK);
            body.push_str(BREAK);
        }
        body.push_str(&format!("Name: <b>{}</b>{}", app.name(), BREAK));
        body.push_str(&format!("Code: <b>{}</b>{}", app.component(), BREAK));
        body.push_str(&format!("Link: {}{}{}", STORE_LINK, app.package(), BREAK));
    }

    let footer = config.footer.as_deref().filter(|f| !f.is_empty());
    if config.include_device_info {
        body.push_str(&format!(
            "{br}{br}OS: {} {}{br}Device: {} {} ({})",
            device.os_release,
            device.os_name(),
            device.manufacturer,
            device.model,
            device.product,
            br = BREAK,
        ));
        if let Some(footer) = footer {
            body.push_str(BREAK);
            body.push_str(&footer.replace('\n', BREAK));
        }
    } else if let Some(footer) = footer {
        body.push_str(BREAK);
        body.push_str(BREAK);
        body.push_str(&footer.replace('\n', BREAK));
    }

    body
}
