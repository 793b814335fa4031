use crate::adaptive::types::{
    Condition, Course, Difficulty, Item, ItemType, Learner, MasteryRecord, Rule,
};
use crate::store::memory::MemoryStores;
use crate::store::ItemStore;

pub const DEMO_LEARNER_ID: &str = "demo";

const GENERATED_PER_DIFFICULTY: usize = 3;
const SEED_RULE_COOLDOWN_MINS: u64 = 120;

struct Curated {
    course: &'static str,
    topic: &'static str,
    difficulty: Difficulty,
    text: &'static str,
    options: [&'static str; 4],
    answer: &'static str,
    explanation: Option<&'static str>,
}

const CURATED: &[Curated] = &[
    Curated {
        course: "DBMS",
        topic: "ER Model",
        difficulty: Difficulty::Easy,
        text: "In ER modeling, a relationship typically connects",
        options: ["Two or more entities", "An entity and an attribute", "Two attributes", "A key and a tuple"],
        answer: "Two or more entities",
        explanation: None,
    },
    Curated {
        course: "DBMS",
        topic: "ER Model",
        difficulty: Difficulty::Medium,
        text: "The cardinality that represents many-to-many between two entities is",
        options: ["1:1", "1:N", "M:N", "N:1"],
        answer: "M:N",
        explanation: Some("Many-to-many is denoted M:N: multiple instances relate on both sides."),
    },
    Curated {
        course: "DBMS",
        topic: "Normalization",
        difficulty: Difficulty::Medium,
        text: "Third Normal Form (3NF) aims to remove",
        options: ["Partial dependencies", "Transitive dependencies", "Multi-valued attributes", "Primary keys"],
        answer: "Transitive dependencies",
        explanation: None,
    },
    Curated {
        course: "DBMS",
        topic: "SQL Basics",
        difficulty: Difficulty::Easy,
        text: "Which clause is used to filter rows in SQL?",
        options: ["SELECT", "FROM", "WHERE", "GROUP"],
        answer: "WHERE",
        explanation: None,
    },
    Curated {
        course: "DSA",
        topic: "Arrays",
        difficulty: Difficulty::Easy,
        text: "Access time of an array element by index is typically",
        options: ["O(1)", "O(n)", "O(log n)", "O(n log n)"],
        answer: "O(1)",
        explanation: None,
    },
    Curated {
        course: "DSA",
        topic: "Stacks",
        difficulty: Difficulty::Easy,
        text: "Stacks follow which principle?",
        options: ["FIFO", "LIFO", "Random", "Priority"],
        answer: "LIFO",
        explanation: None,
    },
    Curated {
        course: "DSA",
        topic: "Queues",
        difficulty: Difficulty::Hard,
        text: "Condition for full in a circular array queue of size n using front/rear indexes is typically",
        options: ["front == rear", "(rear + 1) % n == front", "rear == n", "front == -1"],
        answer: "(rear + 1) % n == front",
        explanation: Some("The next position wrapping to front means no slot is free."),
    },
];

const TOPICS_BY_COURSE: &[(&str, &[&str])] = &[
    ("DBMS", &["ER Model", "Normalization", "SQL Basics"]),
    ("DSA", &["Arrays", "Stacks", "Queues"]),
];

/// Courses without subjects are listed but have no items yet.
const COURSE_CODES: &[(&str, &str)] = &[
    ("DBMS", "DBMS"),
    ("DSA", "DSA"),
    ("Operating Systems", "OS"),
    ("Discrete Maths", "DM"),
    ("Machine Learning", "ML"),
    ("Computer Networks", "CN"),
    ("Predictive Analytics", "PA"),
    ("Full Stack", "FS"),
];

pub fn demo_courses() -> Vec<Course> {
    COURSE_CODES
        .iter()
        .map(|(name, code)| {
            let subjects = TOPICS_BY_COURSE
                .iter()
                .find(|(course, _)| course == name)
                .map(|(_, topics)| *topics)
                .unwrap_or(&[]);
            Course::new(*name, *code, subjects)
        })
        .collect()
}

pub fn demo_items() -> Vec<Item> {
    let mut items: Vec<Item> = CURATED
        .iter()
        .enumerate()
        .map(|(i, c)| Item {
            id: format!("seed-curated-{i}"),
            course: Some(c.course.to_string()),
            text: c.text.to_string(),
            item_type: ItemType::Mcq,
            options: c.options.iter().map(|o| o.to_string()).collect(),
            correct_answer: Some(c.answer.to_string()),
            topic: c.topic.to_string(),
            difficulty: c.difficulty,
            hints: Vec::new(),
            explanation: c.explanation.map(str::to_string),
            bloom_level: None,
            skills: Vec::new(),
            outcomes: Vec::new(),
            source_url: None,
            randomize_options: true,
            is_active: true,
        })
        .collect();

    for (course, topics) in TOPICS_BY_COURSE {
        for topic in *topics {
            for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
                for n in 1..=GENERATED_PER_DIFFICULTY {
                    items.push(generated_item(course, topic, difficulty, n));
                }
            }
        }
    }
    items
}

fn generated_item(course: &str, topic: &str, difficulty: Difficulty, n: usize) -> Item {
    let slug = topic.to_ascii_lowercase().replace(' ', "-");
    let options = vec![
        format!("{topic} concept"),
        format!("{difficulty} case"),
        format!("{topic} edge"),
        format!("{difficulty} distractor"),
    ];
    Item {
        id: format!("seed-{slug}-{difficulty}-{n}"),
        course: Some(course.to_string()),
        text: format!("{topic} {difficulty} practice #{n}"),
        item_type: ItemType::Mcq,
        correct_answer: options.first().cloned(),
        options,
        topic: topic.to_string(),
        difficulty,
        hints: vec![
            "Consider the basic definition.".to_string(),
            "Eliminate clearly wrong choices.".to_string(),
        ],
        explanation: Some(format!("Explanation for {topic} {difficulty} #{n}.")),
        bloom_level: None,
        skills: Vec::new(),
        outcomes: Vec::new(),
        source_url: None,
        randomize_options: true,
        is_active: true,
    }
}

pub fn demo_rules() -> Vec<Rule> {
    TOPICS_BY_COURSE
        .iter()
        .flat_map(|(course, topics)| {
            let upper = if *course == "DBMS" { "0.85" } else { "0.8" };
            topics.iter().map(move |topic| Rule {
                topic: topic.to_string(),
                cooldown_mins: SEED_RULE_COOLDOWN_MINS,
                conditions: vec![
                    Condition::new("mastery < 0.5", Difficulty::Easy),
                    Condition::new(format!("mastery >= 0.5 && mastery < {upper}"), Difficulty::Medium),
                    Condition::new(format!("mastery >= {upper}"), Difficulty::Hard),
                ],
                active: true,
            })
        })
        .collect()
}

pub fn demo_learner() -> Learner {
    let mut learner = Learner::new(DEMO_LEARNER_ID, "Demo User");
    learner.mastery = vec![
        MasteryRecord::with_score("ER Model", 0.45),
        MasteryRecord::with_score("Normalization", 0.6),
        MasteryRecord::with_score("Arrays", 0.5),
    ];
    learner
}

pub async fn seed_demo_catalog(stores: &MemoryStores) {
    let items = demo_items();
    let item_count = items.len();
    if let Err(err) = stores.items.insert_many(items).await {
        tracing::warn!(error = %err, "failed to seed demo items");
        return;
    }
    let rules = demo_rules();
    let rule_count = rules.len();
    for rule in rules {
        stores.rules.insert(rule);
    }
    let courses = demo_courses();
    let course_count = courses.len();
    for course in courses {
        stores.courses.insert(course);
    }
    stores.learners.upsert(demo_learner());

    tracing::info!(
        courses = course_count,
        items = item_count,
        rules = rule_count,
        "demo catalog seeded"
    );
}
