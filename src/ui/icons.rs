pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const LINK: &str = "🔗";
    pub const FILE: &str = "📄";
    pub const TREE: &str = "🌳";
    pub const LEAF: &str = "🍃";
    pub const DATABASE: &str = "🗄️";
}
