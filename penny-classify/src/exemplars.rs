//! Curated example phrases per category, averaged into one exemplar vector each.

use tracing::debug;

use penny_core::Category;

use crate::embedder::{EmbedError, Embedder};
use crate::vector::{mean, normalized};

/// "Other" has no exemplar: it is what a low score falls back to.
pub const PHRASES: &[(Category, &[&str])] = &[
    (
        Category::Groceries,
        &["supermarket groceries", "NTUC FairPrice", "Cold Storage", "Sheng Siong", "fresh produce market", "grocery store"],
    ),
    (
        Category::FoodDining,
        &["restaurant meal", "GrabFood delivery", "foodpanda order", "coffee shop", "hawker centre food", "fast food burger"],
    ),
    (
        Category::Transport,
        &["Grab ride", "taxi fare", "bus and MRT transit", "SimplyGo EZ-Link", "petrol station", "car park parking fee"],
    ),
    (
        Category::Shopping,
        &["Shopee online shopping", "Lazada order", "Amazon purchase", "department store", "clothing apparel", "electronics store"],
    ),
    (
        Category::Subscriptions,
        &["Netflix subscription", "Spotify premium", "iCloud storage", "YouTube Premium", "monthly software subscription", "Disney+ streaming"],
    ),
    (
        Category::Utilities,
        &["SP Services electricity bill", "water and gas utilities", "Singtel mobile bill", "StarHub broadband", "internet service provider", "phone bill"],
    ),
    (
        Category::Healthcare,
        &["clinic consultation", "hospital bill", "pharmacy medicine", "dental treatment", "polyclinic visit", "medical specialist"],
    ),
    (
        Category::Entertainment,
        &["cinema movie tickets", "concert tickets", "video games Steam", "karaoke night", "theme park admission", "bowling alley"],
    ),
    (
        Category::Travel,
        &["airline flight tickets", "hotel booking", "Airbnb stay", "Agoda reservation", "travel agency tour", "Singapore Airlines"],
    ),
    (
        Category::Education,
        &["school tuition fees", "university course fees", "online course Udemy", "textbooks", "enrichment classes", "SkillsFuture course"],
    ),
    (
        Category::Insurance,
        &["insurance premium", "life insurance policy", "health insurance", "Prudential premium", "AIA policy", "car insurance"],
    ),
    (
        Category::Housing,
        &["monthly rent", "HDB loan installment", "mortgage payment", "town council service and conservancy", "condo maintenance fee", "landlord rent"],
    ),
    (
        Category::Investments,
        &["brokerage account deposit", "transfer to investment account", "stock purchase", "robo advisor", "unit trust", "CDP account"],
    ),
    (
        Category::Transfers,
        &["PayNow transfer", "funds transfer to account", "FAST transfer", "bank transfer to friend", "GIRO transfer", "ATM cash withdrawal"],
    ),
    (
        Category::Income,
        &["salary credit", "payroll deposit", "bonus payment", "interest credit", "dividend income", "freelance payment received"],
    ),
    (
        Category::FeesCharges,
        &["annual card fee", "late payment charge", "service charge", "finance charge", "bank fee", "overdraft fee"],
    ),
    (
        Category::PersonalCare,
        &["hair salon", "barber haircut", "Watsons personal care", "spa massage", "beauty products", "nail salon"],
    ),
    (
        Category::GiftsDonations,
        &["charity donation", "gift purchase", "temple offering", "church tithe", "red packet gift", "crowdfunding donation"],
    ),
];

/// Embed every category's phrases and average them into one unit vector.
pub async fn build_exemplars(embedder: &dyn Embedder) -> Result<Vec<(Category, Vec<f32>)>, EmbedError> {
    let mut out = Vec::with_capacity(PHRASES.len());
    for (category, phrases) in PHRASES {
        let texts: Vec<String> = phrases.iter().map(|p| p.to_string()).collect();
        let vectors: Vec<Vec<f32>> = embedder
            .embed_batch(&texts)
            .await?
            .into_iter()
            .map(normalized)
            .collect();
        if vectors.len() != texts.len() {
            return Err(EmbedError::CountMismatch { expected: texts.len(), got: vectors.len() });
        }
        match mean(&vectors) {
            Some(v) => out.push((*category, v)),
            None => debug!(category = %category, "no usable exemplar vectors"),
        }
    }
    Ok(out)
}
