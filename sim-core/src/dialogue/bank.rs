//! The dialogue node graph.
//!
//! Nodes live in a flat arena addressed by string id, so graphs may be
//! cyclic without any special handling; a cycle is just an id that points
//! back. Loaded from `dialogue/bank.json` or built in with
//! [`DialogueBank::builtin`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One selectable answer within a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueChoice {
    pub id: String,
    pub label: String,
    /// Node to jump to. `None` ends the conversation.
    #[serde(default)]
    pub next: Option<String>,
    /// Event ids that must all have fired today for this choice to show.
    #[serde(default)]
    pub requires: Vec<String>,
}

/// One beat of scripted conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueNode {
    pub id: String,
    pub speaker: String,
    /// Line templates, expanded against the current context.
    pub lines: Vec<String>,
    #[serde(default)]
    pub choices: Vec<DialogueChoice>,
    /// Event ids that must all have fired today for this node to open.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Persona used if this speaker is also reachable over free text.
    #[serde(default)]
    pub ai_persona: Option<String>,
}

/// Arena of all scripted nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueBank {
    nodes: BTreeMap<String, DialogueNode>,
}

impl DialogueBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: DialogueNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn get(&self, id: &str) -> Option<&DialogueNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// The bundled conversations: mom's three night moods plus a small-talk
    /// loop for friends. Enough to play a full day without data files.
    pub fn builtin() -> Self {
        let mut bank = Self::new();

        bank.insert(DialogueNode {
            id: "mom.neutral".to_string(),
            speaker: "Mom".to_string(),
            lines: vec![
                "How was day {day}? You look {mood_descriptor}.".to_string(),
                "There's food in the fridge if you want it.".to_string(),
            ],
            choices: vec![
                DialogueChoice {
                    id: "fine".to_string(),
                    label: "It was fine, Mom.".to_string(),
                    next: Some("mom.goodnight".to_string()),
                    requires: Vec::new(),
                },
                DialogueChoice {
                    id: "long_day".to_string(),
                    label: "Long day. I'm going to bed.".to_string(),
                    next: None,
                    requires: Vec::new(),
                },
            ],
            requires: Vec::new(),
            ai_persona: Some("mom".to_string()),
        });

        bank.insert(DialogueNode {
            id: "mom.tired".to_string(),
            speaker: "Mom".to_string(),
            lines: vec![
                "Sorry, sweetheart. Double shift. Is it day {day} already?".to_string(),
            ],
            choices: vec![DialogueChoice {
                id: "goodnight".to_string(),
                label: "Get some sleep, Mom.".to_string(),
                next: Some("mom.goodnight".to_string()),
                requires: Vec::new(),
            }],
            requires: Vec::new(),
            ai_persona: Some("mom".to_string()),
        });

        bank.insert(DialogueNode {
            id: "mom.drunk".to_string(),
            speaker: "Mom".to_string(),
            lines: vec![
                "Come sit with me. Just for a minute.".to_string(),
                "You know I'm proud of you, right?".to_string(),
            ],
            choices: vec![
                DialogueChoice {
                    id: "sit".to_string(),
                    label: "Okay. One minute.".to_string(),
                    next: Some("mom.goodnight".to_string()),
                    requires: Vec::new(),
                },
                DialogueChoice {
                    id: "leave".to_string(),
                    label: "I have school tomorrow.".to_string(),
                    next: None,
                    requires: Vec::new(),
                },
            ],
            requires: Vec::new(),
            ai_persona: Some("mom".to_string()),
        });

        bank.insert(DialogueNode {
            id: "mom.goodnight".to_string(),
            speaker: "Mom".to_string(),
            lines: vec!["Goodnight. Don't stay up on your phone.".to_string()],
            choices: Vec::new(),
            requires: Vec::new(),
            ai_persona: Some("mom".to_string()),
        });

        // Two-node small-talk loop; the cycle is intentional.
        bank.insert(DialogueNode {
            id: "friend.smalltalk".to_string(),
            speaker: "Zara".to_string(),
            lines: vec!["Day {day} and you're still alive. Respect.".to_string()],
            choices: vec![
                DialogueChoice {
                    id: "banter".to_string(),
                    label: "Barely. Ask me again tomorrow.".to_string(),
                    next: Some("friend.smalltalk.reply".to_string()),
                    requires: Vec::new(),
                },
                DialogueChoice {
                    id: "bye".to_string(),
                    label: "Gotta go.".to_string(),
                    next: None,
                    requires: Vec::new(),
                },
            ],
            requires: Vec::new(),
            ai_persona: Some("zara".to_string()),
        });

        bank.insert(DialogueNode {
            id: "friend.smalltalk.reply".to_string(),
            speaker: "Zara".to_string(),
            lines: vec!["I will. I absolutely will.".to_string()],
            choices: vec![DialogueChoice {
                id: "loop".to_string(),
                label: "Anything else?".to_string(),
                next: Some("friend.smalltalk".to_string()),
                requires: Vec::new(),
            }],
            requires: Vec::new(),
            ai_persona: Some("zara".to_string()),
        });

        bank.insert(DialogueNode {
            id: "friend.proud".to_string(),
            speaker: "Lukas".to_string(),
            lines: vec!["Heard you didn't burn the fries today. Growth.".to_string()],
            choices: Vec::new(),
            requires: vec!["perfect_fries".to_string()],
            ai_persona: Some("lukas".to_string()),
        });

        bank
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_bank_links_resolve() {
        let bank = DialogueBank::builtin();
        for id in bank.ids() {
            let node = bank.get(id).unwrap();
            for choice in &node.choices {
                if let Some(next) = &choice.next {
                    assert!(bank.contains(next), "{id} points at missing node {next}");
                }
            }
        }
    }

    #[test]
    fn test_builtin_contains_a_cycle() {
        let bank = DialogueBank::builtin();
        let a = bank.get("friend.smalltalk").unwrap();
        let back = a.choices[0].next.as_deref().unwrap();
        let b = bank.get(back).unwrap();
        assert_eq!(b.choices[0].next.as_deref(), Some("friend.smalltalk"));
    }

    #[test]
    fn test_bank_round_trips_through_json() {
        let bank = DialogueBank::builtin();
        let json = serde_json::to_string(&bank).unwrap();
        let restored: DialogueBank = serde_json::from_str(&json).unwrap();
        assert_eq!(bank, restored);
    }
}
