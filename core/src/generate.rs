use rand::Rng;

use crate::constants::{MAX_SKILLS, MIN_SKILLS, SKILLS};
use crate::types::UserRecord;

/// Builds the user with the given id.
///
/// Everything but the skill list is a pure function of `id`. Skills are drawn
/// from `rng` with replacement, between `MIN_SKILLS` and `MAX_SKILLS` of them.
pub fn generate_user<R: Rng + ?Sized>(id: usize, rng: &mut R) -> UserRecord {
    let skill_count = rng.gen_range(MIN_SKILLS..=MAX_SKILLS);
    let skills = (0..skill_count)
        .map(|_| SKILLS[rng.gen_range(0..SKILLS.len())].to_string())
        .collect();

    UserRecord {
        name: UserRecord::name_for(id),
        email: UserRecord::email_for(id),
        bio: UserRecord::bio_for(id),
        skills,
    }
}

/// Generates `count` users with ids `1..=count`, in id order.
pub fn generate_users(count: usize) -> Vec<UserRecord> {
    let mut rng = rand::thread_rng();
    (1..=count).map(|id| generate_user(id, &mut rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::{generate_user, generate_users};
    use crate::constants::{MAX_SKILLS, MIN_SKILLS, SKILLS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn produces_exactly_count_users_in_id_order() {
        for count in [0, 1, 7, 2_500] {
            let users = generate_users(count);
            assert_eq!(users.len(), count);

            for (index, user) in users.iter().enumerate() {
                let id = index + 1;
                assert_eq!(user.name, format!("User{id} Lastname{id}"));
            }
        }
    }

    #[test]
    fn ids_and_emails_are_unique() {
        let users = generate_users(5_000);
        let names: HashSet<&str> = users.iter().map(|u| u.name.as_str()).collect();
        let emails: HashSet<&str> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(names.len(), users.len());
        assert_eq!(emails.len(), users.len());
    }

    #[test]
    fn email_is_lowercase_first_dot_last() {
        for (index, user) in generate_users(300).iter().enumerate() {
            let id = index + 1;
            assert_eq!(user.email, format!("user{id}.lastname{id}@example.com"));
            assert_eq!(user.email, user.email.to_lowercase());
        }
    }

    #[test]
    fn skills_come_from_the_catalog_with_bounded_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut lengths_seen = HashSet::new();

        for id in 1..=2_000 {
            let user = generate_user(id, &mut rng);
            assert!(
                (MIN_SKILLS..=MAX_SKILLS).contains(&user.skills.len()),
                "user {id} has {} skills",
                user.skills.len()
            );
            for skill in &user.skills {
                assert!(SKILLS.contains(&skill.as_str()), "unknown skill {skill}");
            }
            lengths_seen.insert(user.skills.len());
        }

        // Both bounds are reachable.
        assert!(lengths_seen.contains(&MIN_SKILLS));
        assert!(lengths_seen.contains(&MAX_SKILLS));
    }

    #[test]
    fn fields_other_than_skills_do_not_depend_on_the_rng() {
        let a = generate_user(99, &mut StdRng::seed_from_u64(1));
        let b = generate_user(99, &mut StdRng::seed_from_u64(2));
        assert_eq!(a.name, b.name);
        assert_eq!(a.email, b.email);
        assert_eq!(a.bio, b.bio);
    }
}
