pub mod deep_research;
pub mod fact_check;
pub mod research_compare;
