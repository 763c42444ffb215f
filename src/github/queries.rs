//! GraphQL query strings used to fetch accounts and their repositories.

/// Combined user/organization lookup with a paginated repository connection.
///
/// Both top-level selections are projected in one round-trip; for any real
/// handle exactly one of them resolves. Users restrict the connection to
/// self-owned repositories, organizations take the default affiliation.
pub const ACCOUNT_QUERY: &str = r"
    query($login: String!, $cursor: String) {
      user(login: $login) {
        id
        name
        email
        avatarUrl
        createdAt
        followers { totalCount }
        following { totalCount }
        repositories(first: 100, after: $cursor, ownerAffiliations: OWNER) {
          nodes {
            name
            isFork
            primaryLanguage { name }
          }
          pageInfo { hasNextPage endCursor }
        }
      }
      organization(login: $login) {
        id
        name
        avatarUrl
        createdAt
        isVerified
        membersWithRole { totalCount }
        repositories(first: 100, after: $cursor) {
          nodes {
            name
            isFork
            primaryLanguage { name }
          }
          pageInfo { hasNextPage endCursor }
        }
      }
    }
";
