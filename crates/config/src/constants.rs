//! Tuning constants
//!
//! The fusion weights and the boost ladders encode domain assumptions and
//! are deliberately constants rather than learned or configurable values;
//! they are named here for traceability and future tuning.

/// Score fusion across retrieval methods
pub mod fusion {
    /// Weight of the dense (semantic) score
    pub const SEMANTIC_WEIGHT: f32 = 0.6;
    /// Weight of the BM25 score
    pub const BM25_WEIGHT: f32 = 0.3;
    /// Weight of the TF-IDF score
    pub const TFIDF_WEIGHT: f32 = 0.1;
    /// Per-extra-method multiplier: 1 + BONUS * (methods - 1)
    pub const METHOD_AGREEMENT_BONUS: f32 = 0.1;
}

/// Multiplicative boosts applied after fusion
pub mod boosts {
    /// Exact technical-term ladder: (match-ratio floor, multiplier)
    pub const EXACT_TERM_LADDER: [(f32, f32); 4] =
        [(0.8, 10.0), (0.6, 5.0), (0.4, 2.0), (0.2, 1.5)];

    /// Same merchant + same gateway: (multiplier, score cap)
    pub const PERFECT_MATCH: (f32, f32) = (2.5, 1.0);
    /// Same merchant identifier
    pub const MERCHANT_MATCH: (f32, f32) = (2.0, 0.95);
    /// Same payment gateway
    pub const GATEWAY_MATCH: (f32, f32) = (1.5, 0.85);

    /// Exact/near-exact title match multiplier
    pub const EXACT_TITLE: f32 = 1.2;
    /// Word-overlap ratio that counts as a near-exact title match
    pub const TITLE_OVERLAP_RATIO: f32 = 0.8;
}

/// Semantic relevance gate
pub mod relevance {
    pub const DOMAIN_WEIGHT: f32 = 0.5;
    pub const ENTITY_WEIGHT: f32 = 0.3;
    pub const INTENT_WEIGHT: f32 = 0.2;

    /// A fused hybrid score at or above this is trusted unconditionally
    pub const HYBRID_OVERRIDE: f32 = 0.8;
    /// Composite threshold for high semantic relevance
    pub const HIGH_COMPOSITE: f32 = 0.6;
    /// Composite threshold for moderate semantic relevance
    pub const MODERATE_COMPOSITE: f32 = 0.3;
    /// Relaxed acceptance: hybrid score floor ...
    pub const HYBRID_FLOOR: f32 = 0.5;
    /// ... combined with this composite floor
    pub const HYBRID_COMPOSITE_FLOOR: f32 = 0.1;

    /// Domain-to-domain compatibility values
    pub const DOMAIN_EQUAL: f32 = 1.0;
    pub const DOMAIN_RELATED: f32 = 0.5;
    pub const DOMAIN_UNRELATED: f32 = 0.1;
    /// Intent alignment when intents differ
    pub const INTENT_MISMATCH: f32 = 0.3;
}

/// Confidence scoring
pub mod confidence {
    pub const SIMPLE_FACTOR: f32 = 1.2;
    pub const COMPLEX_FACTOR: f32 = 1.1;
    pub const UNKNOWN_FACTOR: f32 = 0.8;
    /// Bonus when the top candidate came from two or more methods
    pub const AGREEMENT_FACTOR: f32 = 1.1;
    /// Responses scoring below this are converted to honest rejections
    pub const FLOOR: f32 = 0.4;
    /// Complex queries average the top this-many fused scores
    pub const COMPLEX_TOP_N: usize = 3;
}

/// Retrieval parameters
pub mod retrieval {
    /// top_k / min_score per query complexity
    pub const SIMPLE_TOP_K: usize = 3;
    pub const SIMPLE_MIN_SCORE: f32 = 0.2;
    pub const COMPLEX_TOP_K: usize = 8;
    pub const COMPLEX_MIN_SCORE: f32 = 0.15;
    pub const UNKNOWN_TOP_K: usize = 3;
    pub const UNKNOWN_MIN_SCORE: f32 = 0.3;

    /// Sub-searches fetch top_k * this many candidates for fusion
    pub const CANDIDATE_MULTIPLIER: usize = 2;
    /// Low floor applied to dense similarity before fusion
    pub const SEMANTIC_FLOOR: f32 = 0.1;
    /// Minimum TF-IDF cosine considered a hit
    pub const TFIDF_MIN_COSINE: f64 = 0.01;

    /// Okapi BM25 parameters
    pub const BM25_K1: f64 = 1.2;
    pub const BM25_B: f64 = 0.75;

    /// TF-IDF vocabulary cap and document-frequency ceiling
    pub const TFIDF_MAX_FEATURES: usize = 5000;
    pub const TFIDF_MAX_DF: f64 = 0.95;
}

/// Generation parameters per prompt template
pub mod generation {
    pub const EXACT_ID_MAX_TOKENS: usize = 100;
    pub const SIMPLE_MAX_TOKENS: usize = 200;
    pub const COMPLEX_MAX_TOKENS: usize = 400;
    pub const CLASSIFIER_MAX_TOKENS: usize = 10;

    pub const LOW_TEMPERATURE: f32 = 0.1;
    pub const CLASSIFIER_TEMPERATURE: f32 = 0.0;

    /// Resolution excerpt length used by deterministic fallbacks
    pub const FALLBACK_RESOLUTION_CHARS: usize = 100;
    /// Title truncation in source citations
    pub const SOURCE_TITLE_CHARS: usize = 60;
}

/// Cache files and sizes
pub mod cache {
    pub const BM25_FILE: &str = "bm25_index.json";
    pub const TFIDF_FILE: &str = "tfidf_index.json";
    pub const METADATA_FILE: &str = "corpus_metadata.json";

    /// Bounded LRU size for classifier decisions
    pub const CLASSIFIER_CAPACITY: usize = 10_000;
    /// Embedding cache TTL (six hours)
    pub const EMBEDDING_TTL_SECS: u64 = 6 * 60 * 60;
    /// Feedback ring buffer size
    pub const FEEDBACK_CAPACITY: usize = 1000;
}

/// Default service endpoints
pub mod endpoints {
    pub const GEMINI_DEFAULT: &str = "https://generativelanguage.googleapis.com";
    pub const QDRANT_DEFAULT: &str = "http://localhost:6334";
    pub const REDIS_DEFAULT: &str = "redis://127.0.0.1:6379";
}
