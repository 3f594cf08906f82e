//! Deterministic keyword rules: the first, synchronous categorization tier.
//!
//! Rules are checked top to bottom against the lower-cased description plus
//! vendor, and the first hit wins. Order matters: specific categories sit above
//! broader ones they overlap with ("transfer to investment account" must land
//! in Investments, not Transfers).

use crate::category::Category;
use crate::transaction::{CategorySource, Transaction};

/// Keywords match at a word start, so "rent" does not fire inside "current".
const RULES: &[(Category, &[&str])] = &[
    (
        Category::Investments,
        &[
            "investment", "invest ", "brokerage", "moomoo", "tiger brokers", "syfe",
            "stashaway", "endowus", "vanguard", "fidelity", "robinhood", "interactive brokers",
            "ibkr", "cdp ", "srs contribution", "unit trust",
        ],
    ),
    (
        Category::Insurance,
        &[
            "insurance", "prudential", "aia ", "great eastern", "ntuc income", "income insurance",
            "aviva", "manulife", "singlife", "geico", "state farm",
        ],
    ),
    (
        Category::Income,
        &[
            "salary", "payroll", "bonus", "interest credit", "direct deposit", "stipend",
            "freelance", "dividend", "cashback",
        ],
    ),
    (
        Category::FeesCharges,
        &[
            "fee ", "fees", "service charge", "late charge", "late payment", "finance charge",
            "annual fee", "interest charge", "overdraft", "commission",
        ],
    ),
    (
        Category::Subscriptions,
        &[
            "netflix", "spotify", "disney+", "disneyplus", "youtube", "apple.com/bill", "icloud",
            "google storage", "google one", "openai", "chatgpt", "anthropic", "github", "adobe",
            "microsoft", "dropbox", "notion", "figma", "patreon", "subscription", "amazon prime",
            "canva",
        ],
    ),
    (
        Category::Utilities,
        &[
            "sp services", "sp group", "singtel", "starhub", "m1 ", "circles.life", "myrepublic",
            "electricity", "water bill", "gas bill", "city energy", "senoko", "geneco",
            "comcast", "verizon", "at&t", "t-mobile",
        ],
    ),
    (
        Category::Groceries,
        &[
            "ntuc", "fairprice", "cold storage", "giant ", "sheng siong", "redmart", "supermarket",
            "grocer", "h-e-b", "trader joe", "whole foods", "costco", "don don donki", "marketplace",
            "hao mart",
        ],
    ),
    (
        Category::FoodDining,
        &[
            "grabfood", "grab food", "foodpanda", "deliveroo", "doordash", "uber eats", "mcdonald",
            "kfc", "starbucks", "ya kun", "toast box", "restaurant", "cafe", "coffee", "kopitiam",
            "food court", "bakery", "bistro", "burger", "pizza", "sushi", "hawker", "koufu",
        ],
    ),
    (
        Category::Transport,
        &[
            "grab", "gojek", "tada ", "comfortdelgro", "cdg ", "taxi", "bus/mrt", "transitlink",
            "simplygo", "ez-link", "ezlink", "uber", "lyft", "shell", "esso", "caltex", "petrol",
            "parking", "clipper", "metro",
        ],
    ),
    (
        Category::Travel,
        &[
            "airline", "airways", "singapore airlines", "scoot", "jetstar", "airasia", "agoda",
            "booking.com", "expedia", "airbnb", "hotel", "klook", "trip.com",
        ],
    ),
    (
        Category::Healthcare,
        &[
            "clinic", "hospital", "medical", "dental", "pharmacy", "polyclinic", "cvs", "walgreens",
            "physio",
        ],
    ),
    (
        Category::PersonalCare,
        &["watsons", "salon", "barber", "spa ", "sephora", "hair", "beauty", "nail"],
    ),
    (
        Category::Education,
        &[
            "tuition", "university", "school", "course", "udemy", "coursera", "skillsfuture",
            "textbook",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "cinema", "golden village", "shaw theatres", "cathay", "steam", "playstation",
            "nintendo", "xbox", "concert", "sistic", "bowling", "karaoke",
        ],
    ),
    (
        Category::Housing,
        &["rent", "hdb", "condo", "town council", "mortgage", "landlord", "lease", "property"],
    ),
    (
        Category::GiftsDonations,
        &["donation", "charity", "giving.sg", "red cross", "temple", "church", "gift"],
    ),
    (
        Category::Shopping,
        &[
            "shopee", "lazada", "amazon", "qoo10", "taobao", "uniqlo", "h&m", "zara", "ikea",
            "best denki", "courts", "challenger", "walmart", "target", "daiso", "decathlon",
            "mall", "store",
        ],
    ),
    (
        Category::Transfers,
        &[
            "transfer", "paynow", "fast payment", "giro", "funds trf", "trf", "zelle", "venmo",
            "paypal", "remittance", "wise.com", "atm", "cash withdrawal", "bill payment",
            "payment thank you", "autopay",
        ],
    ),
];

/// True when `keyword` occurs in `text` starting at a word boundary.
pub fn contains_at_word_start(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(i, _)| {
        text[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Categorize a description (optionally with a vendor name).
pub fn categorize(description: &str, vendor: Option<&str>) -> Category {
    let mut text = description.to_lowercase();
    if let Some(v) = vendor {
        text.push(' ');
        text.push_str(&v.to_lowercase());
    }
    // Trailing space lets keywords like "aia " match at end of text.
    text.push(' ');

    for (category, keywords) in RULES {
        if keywords.iter().any(|kw| contains_at_word_start(&text, kw)) {
            return *category;
        }
    }

    Category::Other
}

/// Apply the rule engine to a transaction and mark it rule-sourced.
pub fn categorize_transaction(txn: &mut Transaction) {
    let category = categorize(&txn.match_text(), None);
    txn.set_category(category, CategorySource::Rule);
}
