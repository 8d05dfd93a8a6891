//! 类型描述符
//!
//! 描述配置结构的字段名称、类型与嵌套关系，供配置源按名称寻址字段

use crate::error::FieldError;
use crate::schema::Schema;
use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 字段形态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// 叶子字段（标量、序列、映射）
    Leaf {
        /// 原始字段类型
        type_name: &'static str,
        /// 可选形态下的字段类型
        optional_type_name: &'static str,
    },
    /// 嵌套配置结构
    Nested(TypeDescriptor),
}

/// 字段描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// 字段名称
    pub name: &'static str,
    /// 字段形态
    pub shape: Shape,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, shape: Shape) -> Self {
        Self { name, shape }
    }
}

/// 配置结构描述符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// 结构名称
    pub name: &'static str,
    /// 按声明顺序排列的字段
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self { name, fields }
    }

    /// 按名称查找字段
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// 按路径查找字段，路径逐级进入嵌套结构
    pub fn lookup(&self, path: &[&str]) -> Option<&FieldDescriptor> {
        let (head, rest) = path.split_first()?;
        let field = self.field(head)?;
        if rest.is_empty() {
            return Some(field);
        }
        match &field.shape {
            Shape::Nested(nested) => nested.lookup(rest),
            Shape::Leaf { .. } => None,
        }
    }

    /// 深度优先列出所有叶子字段的路径
    pub fn leaf_paths(&self) -> Vec<Vec<&'static str>> {
        let mut paths = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut paths);
        paths
    }

    fn collect_leaves(&self, prefix: &mut Vec<&'static str>, out: &mut Vec<Vec<&'static str>>) {
        for field in &self.fields {
            prefix.push(field.name);
            match &field.shape {
                Shape::Leaf { .. } => out.push(prefix.clone()),
                Shape::Nested(nested) => nested.collect_leaves(prefix, out),
            }
            prefix.pop();
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for field in &self.fields {
            let indent = "  ".repeat(depth);
            match &field.shape {
                Shape::Leaf {
                    optional_type_name, ..
                } => writeln!(f, "{indent}{}: {optional_type_name}", field.name)?,
                Shape::Nested(nested) => {
                    writeln!(f, "{indent}{}: {} {{", field.name, nested.name)?;
                    nested.write_indented(f, depth + 1)?;
                    writeln!(f, "{indent}}}")?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.name)?;
        self.write_indented(f, 1)?;
        write!(f, "}}")
    }
}

/// 与具体配置类型绑定的描述符，传递给每个配置源
pub struct Type<T: Schema> {
    descriptor: Arc<TypeDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Schema> Type<T> {
    pub fn new() -> Self {
        Self {
            descriptor: Arc::new(T::descriptor()),
            _marker: PhantomData,
        }
    }

    /// 获取结构描述符
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// 目标类型的静态标识
    pub fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    /// 目标类型名称
    pub fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    /// 创建一个空的可选形态构建器
    pub fn builder(&self) -> PartialBuilder<T> {
        PartialBuilder {
            partial: T::Partial::default(),
        }
    }
}

impl<T: Schema> Default for Type<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Schema> Clone for Type<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            _marker: PhantomData,
        }
    }
}

impl<T: Schema> fmt::Debug for Type<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("type_name", &self.type_name())
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// 按字段路径逐个填充可选形态值
#[derive(Debug)]
pub struct PartialBuilder<T: Schema> {
    partial: T::Partial,
}

impl<T: Schema> PartialBuilder<T> {
    /// 以原始字符串设置指定路径的叶子字段
    pub fn set(&mut self, path: &[&str], raw: &str) -> Result<&mut Self, FieldError> {
        T::assign_partial(&mut self.partial, path, raw)?;
        Ok(self)
    }

    /// 以点号分隔的路径设置叶子字段，如 `web.port`
    pub fn set_dotted(&mut self, dotted: &str, raw: &str) -> Result<&mut Self, FieldError> {
        let path: Vec<&str> = dotted.split('.').collect();
        self.set(&path, raw)
    }

    /// 完成构建
    pub fn finish(self) -> T::Partial {
        self.partial
    }
}
