use crate::{
    cli::{actions::connect, globals::GlobalArgs},
    session::Session,
};
use anyhow::Result;

fn describe(session: &Session) -> String {
    let Some(user) = session.user().filter(|_| session.is_authenticated()) else {
        return "Not signed in".to_string();
    };

    let mut lines = vec![format!("Signed in as {} <{}> (id {})", user.display_name, user.email, user.id)];

    for membership in &user.organizations {
        lines.push(format!(
            "  {} [{}] {} {}",
            membership.name, membership.organization_id, membership.role, membership.status
        ));
    }

    lines.join("\n")
}

/// Prints the stored session without contacting the API.
/// # Errors
/// Returns an error if the client cannot be initialized.
pub fn execute(globals: &GlobalArgs) -> Result<()> {
    let manager = connect(globals)?;

    println!("{}", describe(&manager.session()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MembershipStatus, OrganizationMembership, Role, UserRecord};
    use secrecy::SecretString;

    #[test]
    fn test_describe_empty() {
        assert_eq!(describe(&Session::default()), "Not signed in");
    }

    #[test]
    fn test_describe_memberships() {
        let user = UserRecord {
            id: "7".to_string(),
            display_name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            organizations: vec![OrganizationMembership {
                organization_id: "1".to_string(),
                name: "Acme".to_string(),
                role: Role::Admin,
                status: MembershipStatus::Active,
            }],
            is_staff: false,
            is_superuser: false,
        };
        let session = Session::new(
            user,
            SecretString::from("A1".to_string()),
            SecretString::from("R1".to_string()),
        );

        let text = describe(&session);
        assert!(text.starts_with("Signed in as Asha <asha@example.com> (id 7)"));
        assert!(text.contains("Acme [1] ADMIN ACTIVE"));
    }
}
