use chrono::{DateTime, NaiveDateTime, Utc};
use shared::{
    domain::{Location, Profile, ProfileId},
    protocol::BackendUser,
};

const IMAGE_HOST: &str = "https://picsum.photos/seed";

fn image_url(seed: &str) -> String {
    format!("{IMAGE_HOST}/{seed}/800/1200")
}

/// Secondary pictures for a profile, seeded `{seed}-2` and `{seed}-3`.
fn gallery(seed: &str) -> Vec<String> {
    (2..=3).map(|n| image_url(&format!("{seed}-{n}"))).collect()
}

/// Maps a backend user record into a queue profile.
///
/// The backend does not serve pictures, bio or goals yet, so those are
/// filled with placeholder values derived from the record.
pub fn profile_from_backend(user: BackendUser) -> Profile {
    let seed = user.id.to_string();
    let role = Some(user.role.trim().to_string()).filter(|role| !role.is_empty());
    let location = Location::parse(&user.location);
    let bio = match (&role, &location) {
        (Some(role), Some(location)) => format!("{role} based in {location}."),
        (Some(role), None) => format!("{role}."),
        (None, Some(location)) => format!("Based in {location}."),
        (None, None) => format!("Say hi to {}!", user.name),
    };
    let joined_at = user.created_at.as_deref().and_then(parse_timestamp);

    Profile {
        image_url: Some(image_url(&seed)),
        additional_images: gallery(&seed),
        bio: Some(bio),
        goals: Some("Open to new creative collaborations.".to_string()),
        age: None,
        location,
        role,
        joined_at,
        id: user.id,
        name: user.name,
    }
}

/// Accepts RFC 3339 and the plain `YYYY-MM-DD HH:MM:SS` form SQL backends emit.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

struct Placeholder {
    id: &'static str,
    name: &'static str,
    seed: &'static str,
    bio: &'static str,
    goals: &'static str,
    age: u32,
    city: &'static str,
    state: &'static str,
}

const PLACEHOLDERS: [Placeholder; 5] = [
    Placeholder {
        id: "mock-1",
        name: "Alex Johnson",
        seed: "alex",
        bio: "Coffee, code, and climbing. I love creative projects and collaborating with other artists.",
        goals: "Looking to expand my creative network and work on exciting film projects.",
        age: 28,
        city: "New York",
        state: "NY",
    },
    Placeholder {
        id: "mock-2",
        name: "Sam Lee",
        seed: "sam",
        bio: "Photographer & traveler. Capturing moments and stories through my lens.",
        goals: "Want to connect with other creatives for collaborative projects.",
        age: 25,
        city: "Los Angeles",
        state: "CA",
    },
    Placeholder {
        id: "mock-3",
        name: "Taylor Kim",
        seed: "taylor",
        bio: "Runner. Reader. Builder. Always working on the next big project.",
        goals: "Seeking creative partners for innovative ventures.",
        age: 30,
        city: "Chicago",
        state: "IL",
    },
    Placeholder {
        id: "mock-4",
        name: "Jordan Martinez",
        seed: "jordan",
        bio: "Designer and artist. Passionate about visual storytelling.",
        goals: "Building a creative community of like-minded individuals.",
        age: 26,
        city: "Austin",
        state: "TX",
    },
    Placeholder {
        id: "mock-5",
        name: "Casey Williams",
        seed: "casey",
        bio: "Musician and producer. Creating sounds that move people.",
        goals: "Collaborating with visual artists for multimedia projects.",
        age: 29,
        city: "Seattle",
        state: "WA",
    },
];

/// Built-in profiles shown when the initial load cannot reach the backend.
pub fn placeholder_profiles() -> Vec<Profile> {
    PLACEHOLDERS
        .iter()
        .filter_map(|p| {
            Some(Profile {
                id: ProfileId::new(p.id).ok()?,
                name: p.name.to_string(),
                image_url: Some(image_url(p.seed)),
                bio: Some(p.bio.to_string()),
                goals: Some(p.goals.to_string()),
                age: Some(p.age),
                location: Some(Location {
                    city: p.city.to_string(),
                    state: p.state.to_string(),
                }),
                additional_images: gallery(p.seed),
                role: None,
                joined_at: None,
            })
        })
        .collect()
}
