use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Discipline {
    Ski,
    Snowboard,
}

impl Discipline {
    pub fn label(self) -> &'static str {
        match self {
            Discipline::Ski => "Ski",
            Discipline::Snowboard => "Snowboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    Beginner,
    Intermediate,
    Advanced,
}

impl GoalCategory {
    pub fn label(self) -> &'static str {
        match self {
            GoalCategory::Beginner => "Beginner stage",
            GoalCategory::Intermediate => "Intermediate stage",
            GoalCategory::Advanced => "Advanced stage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkiGoal {
    pub id: &'static str,
    pub discipline: Discipline,
    pub category: GoalCategory,
    pub title: &'static str,
    pub description: &'static str,
    pub key_points: [&'static str; 3],
}

impl SkiGoal {
    /// Label handed to the analysis model, e.g. "Ski - Carving".
    pub fn prompt_label(&self) -> String {
        format!("{} - {}", self.discipline.label(), self.title)
    }
}

macro_rules! goal {
    ($id:literal, $discipline:ident, $category:ident, $title:literal, $description:literal, [$a:literal, $b:literal, $c:literal]) => {
        SkiGoal {
            id: $id,
            discipline: Discipline::$discipline,
            category: GoalCategory::$category,
            title: $title,
            description: $description,
            key_points: [$a, $b, $c],
        }
    };
}

pub static SKI_GOALS: [SkiGoal; 16] = [
    goal!("ski-beg-adapt", Ski, Beginner, "Getting comfortable",
        "Putting skis on and off, walking on the flat, step turns.",
        ["Balance", "Edge awareness", "Centre of mass control"]),
    goal!("ski-beg-plow-stop", Ski, Beginner, "Snowplough stop",
        "Slowing down and stopping by pushing snow with the ski tails.",
        ["Tail push", "Knees in", "Even pressure"]),
    goal!("ski-beg-plow-turn", Ski, Beginner, "Snowplough turn",
        "Basic left and right turns by shifting weight.",
        ["Weight transfer", "Outside ski loaded", "Body rotation"]),
    goal!("ski-int-semi-para", Ski, Intermediate, "Stem christie",
        "Plough entry into the turn, parallel exit.",
        ["Matching skis", "Smooth weight transfer", "Edge change"]),
    goal!("ski-int-para", Ski, Intermediate, "Basic parallel turn",
        "Parallel through the whole turn, practising extension and release.",
        ["Parallel skis", "Up-and-down extension", "Pressure release"]),
    goal!("ski-int-pole", Ski, Intermediate, "Pole planting",
        "Building rhythm and stability with the pole plant.",
        ["Plant position", "Rhythm sync", "Arm posture"]),
    goal!("ski-adv-carving", Ski, Advanced, "Carving",
        "Clean arcs using the sidecut of the ski.",
        ["Pure edge", "Body inclination", "Resisting centripetal force"]),
    goal!("ski-adv-gs", Ski, Advanced, "Giant slalom",
        "Full control at racing speed.",
        ["High-speed stability", "Deep angulation", "Continuous pressure"]),
    goal!("sb-beg-skating", Snowboard, Beginner, "Skating",
        "Balancing with one foot strapped to the board.",
        ["Centred stance", "Eyes lead", "Back foot push"]),
    goal!("sb-beg-slipping", Snowboard, Beginner, "Side slipping",
        "Controlling speed on the heel and toe edge.",
        ["Ankle control", "Eyes up", "Engaged core"]),
    goal!("sb-beg-leaf", Snowboard, Beginner, "Falling leaf",
        "Traversing side to side across the slope.",
        ["Lateral weight shift", "Eyes first", "Soft knees"]),
    goal!("sb-int-turns", Snowboard, Intermediate, "C and S linked turns",
        "Smooth edge changes between toe and heel side while riding.",
        ["Edge change timing", "Body rotation", "Weight shift"]),
    goal!("sb-int-carve", Snowboard, Intermediate, "Intro to carving",
        "Cutting the snow instead of skidding it.",
        ["Edge angle", "Edge grip", "Stable centre"]),
    goal!("sb-int-weight", Snowboard, Intermediate, "Weight shifting",
        "Adjusting weight dynamically as the pitch changes.",
        ["Front-back balance", "Dynamic adjustment", "Vertical pressure"]),
    goal!("sb-adv-euro", Snowboard, Advanced, "Euro carve",
        "Extreme angulation with a hand touching the snow.",
        ["Extreme angulation", "Deep counter-rotation", "Hand on snow"]),
    goal!("sb-adv-tricks", Snowboard, Advanced, "Ground tricks",
        "Spins and balance tricks using the flex of the board.",
        ["Board flex", "Pop timing", "Body position in the air"]),
];

pub fn find_goal(id: &str) -> Option<&'static SkiGoal> {
    SKI_GOALS.iter().find(|g| g.id == id)
}

pub fn goals_for(discipline: Discipline) -> impl Iterator<Item = &'static SkiGoal> {
    SKI_GOALS.iter().filter(move |g| g.discipline == discipline)
}

/// Goals of a discipline grouped by category, keeping catalog order inside each group.
pub fn grouped_goals(discipline: Discipline) -> Vec<(GoalCategory, Vec<&'static SkiGoal>)> {
    let mut groups: Vec<(GoalCategory, Vec<&'static SkiGoal>)> = Vec::new();
    for goal in goals_for(discipline) {
        match groups.iter_mut().find(|(c, _)| *c == goal.category) {
            Some((_, goals)) => goals.push(goal),
            None => groups.push((goal.category, vec![goal])),
        }
    }
    groups
}

fn first_goal(discipline: Discipline) -> &'static SkiGoal {
    // The catalog is static and covers both disciplines.
    goals_for(discipline)
        .next()
        .unwrap_or(&SKI_GOALS[0])
}

/// Discipline plus a goal that always belongs to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalSelection {
    discipline: Discipline,
    goal: &'static SkiGoal,
}

impl Default for GoalSelection {
    fn default() -> Self {
        Self::new(Discipline::Ski)
    }
}

impl GoalSelection {
    pub fn new(discipline: Discipline) -> Self {
        Self {
            discipline,
            goal: first_goal(discipline),
        }
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    pub fn goal(&self) -> &'static SkiGoal {
        self.goal
    }

    pub fn category(&self) -> GoalCategory {
        self.goal.category
    }

    /// Switching discipline resets the goal to the first goal of the new discipline.
    pub fn switch_discipline(&mut self, discipline: Discipline) {
        *self = Self::new(discipline);
    }

    /// Picks a goal of the current discipline. Returns `None` for unknown ids or
    /// goals of the other discipline, leaving the selection untouched.
    pub fn choose(&mut self, goal_id: &str) -> Option<&'static SkiGoal> {
        let goal = find_goal(goal_id).filter(|g| g.discipline == self.discipline)?;
        self.goal = goal;
        Some(goal)
    }
}
