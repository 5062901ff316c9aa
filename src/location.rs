/// Every field has leading and trailing `/` removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLocation {
    repo: String,
    dist: String,
    area: String,
    arch: String,
}

impl ArchiveLocation {
    pub fn new(repo: &str, dist: &str, area: &str, arch: &str) -> Self {
        Self {
            repo: trim_separators(repo),
            dist: trim_separators(dist),
            area: trim_separators(area),
            arch: trim_separators(arch),
        }
    }

    pub fn packages_url(&self) -> String {
        format!(
            "{}/dists/{}/{}/binary-{}/Packages.gz",
            self.repo, self.dist, self.area, self.arch
        )
    }

    pub fn sources_url(&self) -> String {
        format!("{}/dists/{}/{}/source/Sources.gz", self.repo, self.dist, self.area)
    }

    pub fn release_url(&self) -> String {
        format!("{}/dists/{}/Release", self.repo, self.dist)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpmLocation {
    repo: String,
}

impl RpmLocation {
    pub fn new(repo: &str) -> Self {
        Self {
            repo: trim_separators(repo),
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn repomd_url(&self) -> String {
        format!("{}/repodata/repomd.xml", self.repo)
    }

    pub fn resource_url(&self, href: &str) -> String {
        format!("{}/{}", self.repo, href.trim_start_matches('/'))
    }
}

fn trim_separators(value: &str) -> String {
    value.trim().trim_matches('/').to_string()
}
