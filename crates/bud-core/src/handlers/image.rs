use super::{bullets, unhandled};
use crate::dispatch::Invocation;
use crate::error::Result;
use crate::response::SlackResponse;
use crate::timefmt;

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    match inv.sub.name {
        "list" => list(inv),
        _ => Err(unhandled(inv)),
    }
}

fn list(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = inv.bot;
    let service = bot.catalog().service(inv.switches.require("service")?)?;
    let count = inv.switches.count_or("count", 10)?;
    let repo = service.image_repository();
    let now = bot.now();
    let tags = bot.registry.tags(repo)?;
    let text = bullets(
        tags.iter()
            .take(count)
            .map(|t| format!("`{}`  pushed {}", t.tag, timefmt::age(t.pushed_at, now))),
        format!("No images in {repo}."),
    );
    Ok(SlackResponse::attachment(format!("Images: {repo}"), text))
}

#[cfg(test)]
mod tests {
    use crate::dispatch::testing::*;

    #[test]
    fn newest_first_and_limited() {
        let f = fixture();
        let text = f.run(VIEWER, "image list -s api -n 2").plain_text();
        assert!(text.contains("Images: api"));
        let first = text.find("1.0.3").unwrap();
        let second = text.find("1.0.2").unwrap();
        assert!(first < second);
        assert!(!text.contains("1.0.1"));
    }

    #[test]
    fn uses_service_repository() {
        let f = fixture();
        let text = f.run(VIEWER, "images -s web").plain_text();
        assert!(text.contains("frontend/web"), "{text}");
    }

    #[test]
    fn unknown_service() {
        let f = fixture();
        let text = f.run(VIEWER, "image list -s nope").plain_text();
        assert!(text.contains("service not found: nope"), "{text}");
    }

    #[test]
    fn zero_count_is_rejected() {
        let f = fixture();
        let text = f.run(VIEWER, "image list -s api -n 0").plain_text();
        assert!(text.contains("invalid value '0' for --count"), "{text}");
    }
}
