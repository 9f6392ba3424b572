//! Plain-text rendering of server responses.

use shorturl_core::models::{
    AnalyticsSummary, ClickRecord, DashboardStats, ShortUrl, UrlAnalytics, UserAccount, UserProfile,
};
use shorturl_core::utils::{format_date, truncate_string};

/// Width of the original URL column in link tables
const URL_COLUMN_WIDTH: usize = 40;

pub fn print_home() {
    println!("ShortURL - shorten long links");
    println!("  shorten <url>   create a short link");
    println!("  login           sign in to manage your links");
    println!("  register        create an account");
}

pub fn print_login(notice: Option<&str>, default_username: Option<&str>) {
    if let Some(notice) = notice {
        println!("! {}", notice);
    }
    println!("Log in to manage your short links and track analytics.");
    match default_username {
        Some(name) => println!("  login [username]   (default: {})", name),
        None => println!("  login <username>"),
    }
    println!("  register           create an account first");
}

pub fn print_register() {
    println!("Create an account: you will be asked for username, email, full name and password.");
}

pub fn print_dashboard(user: Option<&UserProfile>, stats: &DashboardStats) {
    if let Some(user) = user {
        println!("Welcome back, {}! ({})", user.display_name(), user.role.as_str());
    }
    println!(
        "Links: {} total, {} active   Clicks: {} total, {} recent",
        stats.total_urls, stats.active_urls, stats.total_clicks, stats.recent_clicks
    );

    if stats.top_urls.is_empty() {
        println!("No links yet. Try `create <url>`.");
        return;
    }

    println!("\nTop links:");
    println!("{:<10} {:<20} {:<40} {:>7}", "CODE", "TITLE", "URL", "CLICKS");
    for link in &stats.top_urls {
        println!(
            "{:<10} {:<20} {:<40} {:>7}",
            link.short_code,
            truncate_string(link.title.as_deref().unwrap_or("-"), 20),
            truncate_string(&link.original_url, URL_COLUMN_WIDTH),
            link.total_clicks
        );
    }
}

pub fn print_links(links: &[ShortUrl], short_link: impl Fn(&str) -> String) {
    if links.is_empty() {
        println!("You have no links yet.");
        return;
    }

    println!(
        "{:>5} {:<32} {:<20} {:<40} {:>7} {:<12}",
        "ID", "SHORT LINK", "TITLE", "URL", "CLICKS", "CREATED"
    );
    for link in links {
        println!(
            "{:>5} {:<32} {:<20} {:<40} {:>7} {:<12}",
            link.id,
            short_link(&link.short_code),
            truncate_string(link.display_title(), 20),
            truncate_string(&link.original_url, URL_COLUMN_WIDTH),
            link.total_clicks(),
            link.created_at.as_deref().map(format_date).unwrap_or_default()
        );
    }
}

pub fn print_prefilled_form(url: &str) {
    println!("Ready to shorten: {}", url);
    println!("  create [--alias A] [--title T] [--expires YYYY-MM-DD]   to confirm");
}

pub fn print_link(link: &ShortUrl, short: &str) {
    println!("{}  ->  {}", short, link.original_url);
    println!("  id:      {}", link.id);
    println!("  title:   {}", link.display_title());
    if let Some(ref alias) = link.custom_alias {
        println!("  alias:   {}", alias);
    }
    if let Some(ref created) = link.created_at {
        println!("  created: {}", format_date(created));
    }
    if let Some(ref expires) = link.expires_at {
        println!("  expires: {}", format_date(expires));
    }
    println!("  clicks:  {}", link.total_clicks());
}

pub fn print_analytics(analytics: &UrlAnalytics, summary: &AnalyticsSummary, clicks: &[ClickRecord]) {
    println!(
        "Clicks: {} total, {} unique visitors, {} today, {} this week",
        analytics.total_clicks.max(summary.total_clicks),
        analytics.unique_visitors.max(summary.unique_visitors),
        summary.clicks_today,
        summary.clicks_this_week
    );
    if let Some(ref last) = analytics.last_clicked_at {
        println!("Last click: {}", format_date(last));
    }

    for (label, entries) in [("Top referers", &summary.top_referers), ("Top countries", &summary.top_countries)] {
        if entries.is_empty() {
            continue;
        }
        println!("{}:", label);
        for entry in entries {
            println!("  {:<30} {:>6}", entry.label.as_deref().unwrap_or("(direct)"), entry.count);
        }
    }

    if !clicks.is_empty() {
        println!("Recent clicks:");
        for click in clicks {
            println!(
                "  {:<14} {:<6} {}",
                click.clicked_at.as_deref().map(format_date).unwrap_or_default(),
                click.country.as_deref().unwrap_or("-"),
                truncate_string(click.referer.as_deref().unwrap_or("-"), 50)
            );
        }
    }
}

pub fn print_profile(user: &UserProfile) {
    println!("{} ({})", user.display_name(), user.username);
    if let Some(ref email) = user.email {
        println!("  email: {}", email);
    }
    println!("  role:  {}", user.role.as_str());
}

pub fn print_users(users: &[UserAccount]) {
    println!("{:>5} {:<20} {:<30} {:<8} {:<8}", "ID", "USERNAME", "EMAIL", "ROLE", "ACTIVE");
    for user in users {
        println!(
            "{:>5} {:<20} {:<30} {:<8} {:<8}",
            user.id,
            truncate_string(&user.username, 20),
            truncate_string(user.email.as_deref().unwrap_or("-"), 30),
            user.role.as_str(),
            if user.is_active { "yes" } else { "no" }
        );
    }
}

pub fn print_help() {
    println!("Commands:");
    println!("  shorten <url>                 shorten a URL");
    println!("  create [url] [--alias A] [--title T] [--expires D]");
    println!("  links | ls                    list your links");
    println!("  show <id>                     show one link");
    println!("  edit <id> [--url U] [--alias A] [--title T] [--expires D]");
    println!("  delete | rm <id>              delete a link");
    println!("  analytics <id> [--limit N]    click analytics");
    println!("  stats | dashboard             dashboard");
    println!("  open <code>                   follow a short link");
    println!("  login [username] | register | logout | whoami");
    println!("  users | role <id> <role> | toggle <id>   (admin)");
    println!("  help | quit");
}
