use bevy::math::Vec2;

/// One sprite blit in display space (top-left origin, y down).
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    /// Asset group, e.g. `grass` or `player/idle`.
    pub group: String,
    pub index: usize,
    pub position: Vec2,
    /// `None` draws at the image's own size.
    pub size: Option<Vec2>,
    pub flip_x: bool,
    pub alpha: f32,
}

impl DrawCommand {
    pub fn new(group: impl Into<String>, index: usize, position: Vec2) -> Self {
        Self {
            group: group.into(),
            index,
            position,
            size: None,
            flip_x: false,
            alpha: 1.0,
        }
    }

    pub fn sized(mut self, size: Vec2) -> Self {
        self.size = Some(size);
        self
    }

    pub fn flipped(mut self, flip_x: bool) -> Self {
        self.flip_x = flip_x;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Per-frame draw output, in paint order.
#[derive(Default, Debug)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
