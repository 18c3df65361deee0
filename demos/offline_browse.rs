use lazypick::browser::{Browser, BrowserOptions};
use lazypick::intake::BulkIntake;
use lazypick::selection::BulkPolicy;
use lazypick::source::InlineSource;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut browser = Browser::new(
        InlineSource::synthetic(100, 12),
        BrowserOptions {
            page_size: 12,
            policy: BulkPolicy::Merge,
        },
    );

    browser.go_to_page(0).await;
    browser.toggle_position(4);

    let mut intake = BulkIntake::new();
    intake.open();
    intake.set_input("20");
    intake.submit(&mut browser)?;

    browser.go_to_page(1).await;
    for row in browser.visible_rows() {
        println!(
            "{} #{} {}",
            if row.selected { "[x]" } else { "[ ]" },
            row.row.rank(),
            row.record.title.as_deref().unwrap_or("")
        );
    }
    println!("Selected: {}", browser.total_selected_count());

    Ok(())
}
