#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub name: &'static str,
    pub relation: &'static str,
}

pub static TRUSTED_CONTACTS: [Contact; 4] = [
    Contact {
        name: "Mom",
        relation: "Family",
    },
    Contact {
        name: "Dad",
        relation: "Family",
    },
    Contact {
        name: "Aman Kanojiya",
        relation: "Friend",
    },
    Contact {
        name: "Brother",
        relation: "Family",
    },
];

pub fn find_contact(name: &str) -> Option<&'static Contact> {
    TRUSTED_CONTACTS.iter().find(|c| c.name == name)
}
