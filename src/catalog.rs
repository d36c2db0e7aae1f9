//! Interview question catalog — immutable, ordered, grouped into modules.
//!
//! Built once at process start and shared via `Arc`. Each question is a
//! tagged variant carrying only the constraints relevant to its kind, so
//! validation can match exhaustively.

/// Type-specific constraints for a question.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    /// Exactly one of `options`, byte-equal.
    Select { options: Vec<String> },
    /// Comma-separated subset of `options`.
    MultiSelect { options: Vec<String> },
    /// Integer within `[min, max]`.
    Number { min: i64, max: i64 },
    /// Integer within `[min, max]`; `step` is a client hint only.
    Range { min: i64, max: i64, step: i64 },
    /// Short free-form answer, single line.
    Line { max_length: usize },
    /// Long free-form answer.
    Text { max_length: usize },
}

impl QuestionKind {
    /// Wire tag for the question frame, matching the client protocol.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Select { .. } => "select",
            Self::MultiSelect { .. } => "multiselect",
            Self::Number { .. } => "number",
            Self::Range { .. } => "range",
            Self::Line { .. } => "string",
            Self::Text { .. } => "text",
        }
    }
}

/// A single question descriptor.
#[derive(Debug, Clone)]
pub struct Question {
    /// Unique across the whole catalog; keys the collected answer map.
    pub id: String,
    pub prompt: String,
    /// Module key this question belongs to.
    pub module: String,
    pub module_title: String,
    /// Dense, zero-based position in the flattened sequence.
    pub global_index: usize,
    pub kind: QuestionKind,
}

/// A named group of consecutive questions sharing a theme.
pub struct CatalogModule {
    pub key: &'static str,
    pub title: &'static str,
    pub questions: Vec<(&'static str, &'static str, QuestionKind)>,
}

/// The flattened, read-only question catalog.
#[derive(Debug)]
pub struct Catalog {
    questions: Vec<Question>,
}

impl Catalog {
    /// Flatten module definitions into a dense global sequence.
    pub fn from_modules(modules: Vec<CatalogModule>) -> Self {
        let mut questions = Vec::new();
        for module in modules {
            for (id, prompt, kind) in module.questions {
                questions.push(Question {
                    id: id.to_string(),
                    prompt: prompt.to_string(),
                    module: module.key.to_string(),
                    module_title: module.title.to_string(),
                    global_index: questions.len(),
                    kind,
                });
            }
        }
        Self { questions }
    }

    /// Total number of questions in the interview.
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Look up a question by its zero-based global index.
    pub fn by_global_index(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// All questions in catalog order.
    pub fn all(&self) -> &[Question] {
        &self.questions
    }

    /// The built-in IT-career interview: three modules, twelve questions.
    pub fn standard() -> Self {
        let positions = [
            "Backend Developer",
            "Frontend Developer",
            "Fullstack Developer",
            "Mobile Developer",
            "iOS Developer",
            "Android Developer",
            "ML Developer",
            "Machine Learning Engineer",
            "Data Engineer",
            "Data Scientist",
            "DevOps Engineer",
            "Systems Developer",
            "QA Engineer",
            "Test Automation Engineer",
            "Product Manager",
            "Project Manager",
            "Engineering Manager",
            "Business Analyst",
            "Systems Analyst",
            "Marketing Analyst",
            "Technical Support Specialist",
            "Network Engineer",
            "System Administrator",
            "Database Administrator",
            "Security Engineer",
            "Solution Architect",
            "Tech Lead",
        ];
        let opts = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self::from_modules(vec![
            CatalogModule {
                key: "context",
                title: "Starting context",
                questions: vec![
                    (
                        "current_position",
                        "What is your current position?",
                        QuestionKind::Select {
                            options: opts(&positions),
                        },
                    ),
                    (
                        "years_in_position",
                        "How many years have you worked in this position?",
                        QuestionKind::Number { min: 0, max: 50 },
                    ),
                    (
                        "key_projects",
                        "Describe 2-3 key IT projects or achievements (stack, role, outcome)",
                        QuestionKind::Text { max_length: 500 },
                    ),
                ],
            },
            CatalogModule {
                key: "goals",
                title: "Career goals",
                questions: vec![
                    (
                        "target_specialization",
                        "Which IT specialization do you want to grow into?",
                        QuestionKind::Select {
                            options: opts(&positions),
                        },
                    ),
                    (
                        "preferred_activities",
                        "Which kinds of IT work interest you? (pick several)",
                        QuestionKind::MultiSelect {
                            options: opts(&[
                                "Software Development",
                                "Machine Learning / AI",
                                "Infrastructure & DevOps",
                                "Team Leadership",
                                "Systems Analysis",
                                "Data Science",
                                "Security",
                                "Product Management",
                                "Testing & QA",
                                "UX/UI Design",
                                "Research & Emerging Tech",
                            ]),
                        },
                    ),
                    (
                        "position_ambitions",
                        "Who do you want to be in 3-5 years? (e.g. Senior Developer, Team Lead, Architect, CTO)",
                        QuestionKind::Line { max_length: 100 },
                    ),
                    (
                        "salary_expectations",
                        "What are your monthly salary expectations?",
                        QuestionKind::Range {
                            min: 60_000,
                            max: 700_000,
                            step: 20_000,
                        },
                    ),
                ],
            },
            CatalogModule {
                key: "skills",
                title: "Professional level",
                questions: vec![
                    (
                        "current_skills",
                        "Which core IT skills do you have?",
                        QuestionKind::MultiSelect {
                            options: opts(&[
                                "Programming",
                                "Algorithms & Data Structures",
                                "DevOps Practices",
                                "Systems Administration",
                                "Databases",
                                "Testing",
                                "Machine Learning",
                                "Data Engineering",
                                "Security",
                                "Architecture Design",
                            ]),
                        },
                    ),
                    (
                        "tools_experience",
                        "Which technologies and tools do you use?",
                        QuestionKind::MultiSelect {
                            options: opts(&[
                                "Python",
                                "Go",
                                "Java",
                                "JavaScript/TypeScript",
                                "Rust",
                                "SQL",
                                "PostgreSQL",
                                "MongoDB",
                                "Docker",
                                "Kubernetes",
                                "CI/CD",
                                "Linux/Unix",
                                "Figma",
                                "Jira/Confluence",
                                "TensorFlow / PyTorch",
                                "Spark",
                            ]),
                        },
                    ),
                    (
                        "soft_skills",
                        "Which soft skills help you most at work?",
                        QuestionKind::MultiSelect {
                            options: opts(&[
                                "Communication",
                                "Time Management",
                                "Critical Thinking",
                                "Adaptability",
                                "Empathy",
                                "Teamwork",
                                "Problem Solving",
                                "Creativity",
                            ]),
                        },
                    ),
                    (
                        "education",
                        "Tell us about your IT education (university, courses, certificates)",
                        QuestionKind::Text { max_length: 300 },
                    ),
                    (
                        "learning_goals",
                        "Which technologies or skills are you planning to learn next?",
                        QuestionKind::Text { max_length: 300 },
                    ),
                ],
            },
        ])
    }
}
